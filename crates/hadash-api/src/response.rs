use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::endpoint::EndpointKind;
use crate::error::Error;

/// Response body as delivered by the backend.
///
/// JSON responses are parsed eagerly; anything else (or JSON that fails
/// to parse) is kept as text. [`ApiResponse::json`] decodes both shapes
/// the same way.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Classify a raw body using the response content type.
    pub fn from_text(text: String, content_type: Option<&str>) -> Self {
        let is_json = content_type.is_some_and(|ct| ct.contains("json"));
        if is_json {
            if let Ok(value) = serde_json::from_str(&text) {
                return Self::Json(value);
            }
        }
        Self::Text(text)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        match self {
            Self::Json(value) => T::deserialize(value).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: value.to_string(),
            }),
            Self::Text(text) => serde_json::from_str(text).map_err(|e| {
                let preview: String = text.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body: text.clone(),
                }
            }),
        }
    }
}

/// A response from whichever endpoint answered first.
///
/// Non-success statuses are still responses: failover only reacts to
/// transport-level failures.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub endpoint: EndpointKind,
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub(crate) async fn from_reqwest(
        endpoint: EndpointKind,
        resp: reqwest::Response,
    ) -> Result<Self, Error> {
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = resp.text().await?;

        Ok(Self {
            endpoint,
            status,
            body: ResponseBody::from_text(text, content_type.as_deref()),
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body into `T`, whether it arrived parsed or as text.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        self.body.decode()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_content_type_is_parsed_eagerly() {
        let body = ResponseBody::from_text(r#"{"a":1}"#.into(), Some("application/json"));
        assert_eq!(body, ResponseBody::Json(json!({"a": 1})));
    }

    #[test]
    fn text_body_still_decodes() {
        let body = ResponseBody::from_text(r#"[1,2,3]"#.into(), Some("text/plain"));
        assert!(matches!(body, ResponseBody::Text(_)));
        let decoded: Vec<u8> = body.decode().unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }

    #[test]
    fn malformed_body_reports_preview() {
        let body = ResponseBody::from_text("401: Unauthorized".into(), Some("text/plain"));
        let err = body.decode::<Vec<Value>>().unwrap_err();
        match err {
            Error::Deserialization { message, body } => {
                assert!(message.contains("401: Unauthorized"), "got: {message}");
                assert_eq!(body, "401: Unauthorized");
            }
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }
}
