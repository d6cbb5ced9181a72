#![allow(clippy::unwrap_used)]
// End-to-end tests for the companion: router and reactor against a
// wiremock Home Assistant, wired through an in-memory settings store.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hadash_api::FailoverClient;
use hadash_core::settings::{
    EXTERNAL_HA_IP, HA_TOKEN, LIST_FETCH_RANDOM, LOCAL_HA_IP, SENSORS_LIST,
};
use hadash_core::{
    ChangeReactor, CommandRouter, Companion, DeviceResponse, MemorySettings, ResponseData,
    SensorDirectory, SettingsChange, SettingsSource, SettingsStore,
};
use tokio::sync::{broadcast, mpsc};

// ── Helpers ─────────────────────────────────────────────────────────

const UNREACHABLE: &str = "http://127.0.0.1:1";

fn states_body() -> Value {
    json!([
        {
            "entity_id": "light.kitchen",
            "state": "on",
            "attributes": { "friendly_name": "Kitchen Light" }
        },
        {
            "entity_id": "sensor.humidity",
            "state": "42",
            "attributes": { "unit_of_measurement": "%" }
        },
        { "entity_id": "switch.fan", "state": "off" }
    ])
}

fn selection(keys: &[&str]) -> String {
    let entries: Vec<Value> = keys
        .iter()
        .map(|k| json!({ "key": k, "value": true }))
        .collect();
    Value::Array(entries).to_string()
}

fn settings_for(local: Option<&str>, external: Option<&str>) -> Arc<dyn SettingsStore> {
    let store = MemorySettings::with_values([(HA_TOKEN, "test-token")]);
    if let Some(url) = local {
        store.set(LOCAL_HA_IP, url.to_owned());
    }
    if let Some(url) = external {
        store.set(EXTERNAL_HA_IP, url.to_owned());
    }
    Arc::new(store)
}

fn client_for(settings: &Arc<dyn SettingsStore>) -> FailoverClient {
    let source = Arc::new(SettingsSource::new(Arc::clone(settings)));
    FailoverClient::with_client(
        reqwest::Client::new(),
        Arc::clone(&source) as _,
        source,
        Duration::from_secs(5),
    )
}

fn router_for(settings: &Arc<dyn SettingsStore>) -> CommandRouter {
    CommandRouter::new(SensorDirectory::new(client_for(settings), Arc::clone(settings)))
}

async fn mount_states(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/states"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(states_body()))
        .mount(server)
        .await;
}

fn result_of(response: DeviceResponse) -> Value {
    match response.data {
        ResponseData::Result { result } => result,
        ResponseData::Error { error } => panic!("expected result, got error: {error}"),
    }
}

fn error_of(response: DeviceResponse) -> String {
    match response.data {
        ResponseData::Error { error } => error,
        ResponseData::Result { result } => panic!("expected error, got result: {result}"),
    }
}

// ── Sensor directory ────────────────────────────────────────────────

#[tokio::test]
async fn test_enabled_sensors_is_repeatable() {
    let server = MockServer::start().await;
    mount_states(&server).await;

    let settings = settings_for(Some(&server.uri()), None);
    settings.set(
        SENSORS_LIST,
        selection(&["sensor.humidity", "sensor.gone", "light.kitchen"]),
    );
    let directory = SensorDirectory::new(client_for(&settings), Arc::clone(&settings));
    let cancel = CancellationToken::new();

    let first = directory.enabled_sensors(&cancel).await.unwrap();
    let second = directory.enabled_sensors(&cancel).await.unwrap();

    assert_eq!(first, second);
    let keys: Vec<_> = first.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["sensor.humidity", "light.kitchen"]);
    assert_eq!(first[0].state, "42%");
    assert_eq!(first[1].title, "Kitchen Light");
}

#[tokio::test]
async fn test_enabled_sensors_uses_external_when_local_is_down() {
    let external = MockServer::start().await;
    mount_states(&external).await;

    let settings = settings_for(Some(UNREACHABLE), Some(&external.uri()));
    settings.set(SENSORS_LIST, selection(&["switch.fan"]));
    let directory = SensorDirectory::new(client_for(&settings), Arc::clone(&settings));

    let sensors = directory
        .enabled_sensors(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sensors.len(), 1);
    assert_eq!(sensors[0].kind, "switch");
}

// ── Command router ──────────────────────────────────────────────────

#[tokio::test]
async fn test_toggle_switch_posts_turn_on() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/services/switch/turn_on"))
        .and(body_json(json!({ "entity_id": "switch.fan" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings_for(Some(&server.uri()), None);
    let payload = json!({ "method": "TOGGLE_SWITCH", "value": true, "entity_id": "switch.fan" });

    let response = router_for(&settings)
        .dispatch(payload.to_string().as_bytes(), &CancellationToken::new())
        .await;

    assert_eq!(result_of(response), json!([]));
}

#[tokio::test]
async fn test_toggle_with_service_and_falsy_value_turns_off() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/services/light/turn_off"))
        .and(body_json(json!({ "entity_id": "light.kitchen" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings_for(Some(&server.uri()), None);
    let payload = json!({
        "method": "TOGGLE_SWITCH",
        "value": 0,
        "service": "light",
        "entity_id": "light.kitchen"
    });

    let response = router_for(&settings)
        .dispatch(payload.to_string().as_bytes(), &CancellationToken::new())
        .await;

    assert!(!response.is_error());
}

#[tokio::test]
async fn test_toggle_failure_is_answered_in_band() {
    let settings = settings_for(Some(UNREACHABLE), None);
    let payload = json!({ "method": "TOGGLE_SWITCH", "value": true, "entity_id": "switch.fan" });

    let response = router_for(&settings)
        .dispatch(payload.to_string().as_bytes(), &CancellationToken::new())
        .await;

    let error = error_of(response);
    assert!(error.starts_with("Connection error"), "got: {error}");
}

#[tokio::test]
async fn test_get_sensors_list_returns_selection() {
    let server = MockServer::start().await;
    mount_states(&server).await;

    let settings = settings_for(Some(&server.uri()), None);
    settings.set(SENSORS_LIST, selection(&["light.kitchen"]));

    let response = router_for(&settings)
        .dispatch(br#"{"method":"GET_SENSORS_LIST"}"#, &CancellationToken::new())
        .await;

    assert_eq!(
        result_of(response),
        json!([{ "key": "light.kitchen", "title": "Kitchen Light", "state": "on", "type": "light" }])
    );
}

#[tokio::test]
async fn test_get_sensors_list_backend_failure_becomes_error_payload() {
    let settings = settings_for(Some(UNREACHABLE), Some("not a url"));

    let response = router_for(&settings)
        .dispatch(br#"{"method":"GET_SENSORS_LIST"}"#, &CancellationToken::new())
        .await;

    let error = error_of(response);
    assert!(error.contains("local"), "got: {error}");
    assert!(error.contains("external"), "got: {error}");
}

#[tokio::test]
async fn test_get_sensors_list_without_addresses() {
    let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new());

    let response = router_for(&settings)
        .dispatch(br#"{"method":"GET_SENSORS_LIST"}"#, &CancellationToken::new())
        .await;

    assert_eq!(error_of(response), "No Home Assistant address configured");
}

#[tokio::test]
async fn test_unknown_method_is_answered() {
    let settings = settings_for(None, None);

    let response = router_for(&settings)
        .dispatch(br#"{"method":"REBOOT"}"#, &CancellationToken::new())
        .await;

    assert_eq!(error_of(response), "Unsupported method: REBOOT");
}

#[tokio::test]
async fn test_undecodable_payload_is_answered() {
    let settings = settings_for(None, None);

    let response = router_for(&settings)
        .dispatch(b"\xff\xfe", &CancellationToken::new())
        .await;

    assert!(error_of(response).starts_with("Invalid JSON"));
}

// ── Companion lifecycle ─────────────────────────────────────────────

#[tokio::test]
async fn test_companion_answers_concurrent_requests() {
    let server = MockServer::start().await;
    mount_states(&server).await;

    let settings = settings_for(Some(&server.uri()), None);
    settings.set(SENSORS_LIST, selection(&["switch.fan"]));
    let companion = Companion::with_client(Arc::clone(&settings), client_for(&settings));

    let request = json!({ "method": "GET_SENSORS_LIST" });
    let nope = json!({ "method": "NOPE" });
    let (a, b) = tokio::join!(
        companion.request_json(&request),
        companion.request_json(&nope),
    );

    assert_eq!(result_of(a.unwrap())[0]["key"], "switch.fan");
    assert!(b.unwrap().is_error());

    companion.shutdown().await;
}

#[tokio::test]
async fn test_selection_change_pushes_list_update() {
    let server = MockServer::start().await;
    mount_states(&server).await;

    let settings = settings_for(Some(&server.uri()), None);
    let companion = Companion::with_client(Arc::clone(&settings), client_for(&settings));

    settings.set(SENSORS_LIST, selection(&["sensor.humidity"]));

    let call = tokio::time::timeout(Duration::from_secs(5), companion.next_call())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(call.action, "listUpdate");
    assert_eq!(
        call.value,
        json!([{ "key": "sensor.humidity", "title": "sensor.humidity", "state": "42%", "type": "sensor" }])
    );

    companion.shutdown().await;
}

#[tokio::test]
async fn test_list_fetch_random_writes_catalog() {
    let server = MockServer::start().await;
    mount_states(&server).await;

    let settings = settings_for(Some(&server.uri()), None);
    let companion = Companion::with_client(Arc::clone(&settings), client_for(&settings));

    settings.set(LIST_FETCH_RANDOM, "0.42".to_owned());

    // The catalog write is itself a selection change; nothing in it is
    // selected yet, so the follow-up update is empty.
    let call = tokio::time::timeout(Duration::from_secs(5), companion.next_call())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(call.value, json!([]));

    let stored: Value = serde_json::from_str(&settings.get(SENSORS_LIST).unwrap()).unwrap();
    assert_eq!(
        stored,
        json!([
            { "key": "light.kitchen", "title": "Kitchen Light" },
            { "key": "sensor.humidity", "title": "sensor.humidity" },
            { "key": "switch.fan", "title": "switch.fan" }
        ])
    );

    companion.shutdown().await;
}

#[tokio::test]
async fn test_failed_refresh_leaves_selection_untouched() {
    let settings = settings_for(Some(UNREACHABLE), None);
    settings.set(SENSORS_LIST, selection(&["switch.fan"]));
    let companion = Companion::with_client(Arc::clone(&settings), client_for(&settings));

    settings.set(LIST_FETCH_RANDOM, "1".to_owned());

    let calls = companion.take_calls(Duration::from_millis(300)).await;
    assert!(calls.is_empty());
    assert_eq!(settings.get(SENSORS_LIST).unwrap(), selection(&["switch.fan"]));

    companion.shutdown().await;
}

#[tokio::test]
async fn test_undrained_calls_do_not_block_refresh_or_shutdown() {
    let server = MockServer::start().await;
    mount_states(&server).await;

    let settings = settings_for(Some(&server.uri()), None);
    let companion = Companion::with_client(Arc::clone(&settings), client_for(&settings));

    // More updates than the outbound queue holds, none of them drained.
    for _ in 0..40 {
        settings.set(SENSORS_LIST, selection(&["switch.fan"]));
    }
    settings.set(LIST_FETCH_RANDOM, "0.7".to_owned());

    let refreshed = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if settings
                .get(SENSORS_LIST)
                .is_some_and(|list| list.contains("Kitchen Light"))
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(refreshed.is_ok(), "catalog refresh never ran");

    tokio::time::timeout(Duration::from_secs(5), companion.shutdown())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_lagged_changes_resend_sensor_list() {
    let server = MockServer::start().await;
    mount_states(&server).await;

    let settings = settings_for(Some(&server.uri()), None);
    settings.set(SENSORS_LIST, selection(&["light.kitchen"]));
    let directory = SensorDirectory::new(client_for(&settings), Arc::clone(&settings));

    let (calls_tx, mut calls_rx) = mpsc::channel(8);
    let reactor = ChangeReactor::new(directory, Arc::clone(&settings), calls_tx);

    // A one-slot channel overrun by unrelated keys: the reactor sees a lag,
    // then the last change, then the closed channel.
    let (changes_tx, changes_rx) = broadcast::channel(1);
    for key in ["theme", "brightness", "locale"] {
        changes_tx
            .send(SettingsChange {
                key: key.to_owned(),
                new_value: Some("x".to_owned()),
                old_value: None,
            })
            .unwrap();
    }
    drop(changes_tx);

    tokio::time::timeout(
        Duration::from_secs(5),
        reactor.run(changes_rx, CancellationToken::new()),
    )
    .await
    .unwrap();

    let call = calls_rx.try_recv().unwrap();
    assert_eq!(call.action, "listUpdate");
    assert_eq!(call.value[0]["title"], "Kitchen Light");
    assert!(calls_rx.try_recv().is_err(), "only the lag resends the list");
}

#[tokio::test]
async fn test_requests_after_shutdown_fail() {
    let settings = settings_for(None, None);
    let companion = Companion::with_client(Arc::clone(&settings), client_for(&settings));

    companion.shutdown().await;

    let result = companion.request(&br#"{"method":"GET_SENSORS_LIST"}"#[..]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_start_reads_addresses_from_settings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/states"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(states_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemorySettings::with_values([
        (HA_TOKEN, "secret".to_owned()),
        (LOCAL_HA_IP, server.uri()),
        (SENSORS_LIST, selection(&["light.kitchen"])),
    ]);
    let companion =
        Companion::start(Arc::new(store), &hadash_api::TransportConfig::default()).unwrap();

    let response = companion
        .request_json(&json!({ "method": "GET_SENSORS_LIST" }))
        .await
        .unwrap();
    assert_eq!(result_of(response)[0]["title"], "Kitchen Light");

    companion.shutdown().await;
}
