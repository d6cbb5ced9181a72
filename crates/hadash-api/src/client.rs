// Failover HTTP client
//
// Wraps `reqwest::Client` with bearer-token injection and local/external
// endpoint failover. Typed Home Assistant calls live in `hass.rs` as
// inherent methods to keep this module focused on transport mechanics.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::endpoint::{EndpointKind, EndpointResolver, TokenSource};
use crate::error::{EndpointFailure, Error, FailoverError};
use crate::response::ApiResponse;
use crate::transport::TransportConfig;

/// Method, body and extra headers for one request.
///
/// Extra headers are merged after the injected `Authorization` and
/// `Content-Type` headers and replace them on conflict.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<String>,
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: HeaderMap::new(),
        }
    }

    /// A POST carrying `body` serialized as JSON text.
    pub fn post_json(body: &impl Serialize) -> Result<Self, Error> {
        let body = serde_json::to_string(body).map_err(|e| Error::Deserialization {
            message: format!("failed to encode request body: {e}"),
            body: String::new(),
        })?;
        Ok(Self {
            method: Method::POST,
            body: Some(body),
            headers: HeaderMap::new(),
        })
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Authenticated client that tries the local endpoint, then the external one.
///
/// Cheaply cloneable. Endpoints and token are re-read from the injected
/// sources on every request.
#[derive(Clone)]
pub struct FailoverClient {
    http: reqwest::Client,
    resolver: Arc<dyn EndpointResolver>,
    tokens: Arc<dyn TokenSource>,
    timeout: Duration,
}

impl FailoverClient {
    /// Build a client (and its `reqwest::Client`) from a `TransportConfig`.
    pub fn new(
        resolver: Arc<dyn EndpointResolver>,
        tokens: Arc<dyn TokenSource>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, resolver, tokens, transport.timeout))
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        resolver: Arc<dyn EndpointResolver>,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            resolver,
            tokens,
            timeout,
        }
    }

    /// Per-attempt deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `path` to the first endpoint that answers.
    ///
    /// Fails fast with [`Error::NoEndpointsConfigured`] when neither address
    /// is set. Cancellation aborts immediately without trying the next
    /// endpoint. When every attempt fails the returned
    /// [`Error::Connection`] holds each endpoint's cause.
    pub async fn request(
        &self,
        path: &str,
        options: &RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, Error> {
        let endpoints = self.resolver.endpoints();
        if endpoints.is_empty() {
            return Err(Error::NoEndpointsConfigured);
        }

        let headers = self.headers(&options.headers)?;
        let mut failures = Vec::new();

        for (kind, base_url) in endpoints.candidates() {
            match self
                .attempt(kind, base_url, path, options, &headers, cancel)
                .await
            {
                Ok(resp) => {
                    if !failures.is_empty() {
                        info!(endpoint = %kind, "fell back to {kind} endpoint");
                    }
                    return Ok(resp);
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(error) => {
                    warn!(endpoint = %kind, %error, "request to {kind} endpoint failed");
                    failures.push(EndpointFailure {
                        kind,
                        base_url: base_url.to_owned(),
                        error,
                    });
                }
            }
        }

        Err(Error::Connection(FailoverError::new(failures)))
    }

    async fn attempt(
        &self,
        kind: EndpointKind,
        base_url: &str,
        path: &str,
        options: &RequestOptions,
        headers: &HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, Error> {
        let url = join_url(base_url, path)?;
        debug!("{} {url} ({kind})", options.method);

        let mut builder = self
            .http
            .request(options.method.clone(), url)
            .headers(headers.clone());
        if let Some(ref body) = options.body {
            builder = builder.body(body.clone());
        }

        let send = async {
            let resp = builder.send().await?;
            ApiResponse::from_reqwest(kind, resp).await
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(self.timeout, send) => match result {
                Ok(inner) => inner,
                Err(_) => Err(Error::Timeout { after: self.timeout }),
            },
        }
    }

    /// Injected defaults first, caller headers on top.
    fn headers(&self, extra: &HeaderMap) -> Result<HeaderMap, Error> {
        let token = self.tokens.token();
        if token.is_none() {
            debug!("no access token configured, sending empty bearer");
        }
        let bearer = format!(
            "Bearer {}",
            token.as_ref().map_or("", |t| t.expose_secret())
        );
        let mut auth = HeaderValue::from_str(&bearer)
            .map_err(|e| Error::InvalidHeader(format!("authorization: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in extra {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }
}

/// Concatenate a base address and an absolute API path.
fn join_url(base_url: &str, path: &str) -> Result<Url, Error> {
    let base = base_url.trim_end_matches('/');
    Ok(Url::parse(&format!("{base}{path}"))?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn join_url_tolerates_trailing_slash() {
        let url = join_url("http://192.168.1.2:8123/", "/api/states").unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.2:8123/api/states");
    }

    #[test]
    fn join_url_rejects_bare_host() {
        assert!(matches!(
            join_url("192.168.1.2:8123", "/api/states"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn post_json_serializes_body() {
        let opts = RequestOptions::post_json(&serde_json::json!({"entity_id": "switch.fan"}))
            .unwrap();
        assert_eq!(opts.method, Method::POST);
        assert_eq!(opts.body.as_deref(), Some(r#"{"entity_id":"switch.fan"}"#));
    }
}
