//! hyper + rustls transport shared by the REST and auth endpoints.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use crate::error::BackendError;

const MAX_ERROR_PREVIEW: usize = 512;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Use the globally installed crypto provider if there is one, aws-lc-rs otherwise.
fn get_crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

fn build_https_connector(allow_http: bool) -> Result<HttpsConnector<HttpConnector>, BackendError> {
    let builder = hyper_rustls::HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(get_crypto_provider())
        .map_err(|e| BackendError::Config(format!("TLS setup failed: {e}")))?;
    let connector = if allow_http {
        builder.https_or_http().enable_all_versions().build()
    } else {
        builder.https_only().enable_all_versions().build()
    };
    Ok(connector)
}

/// Fully buffered response.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Error text from a failed response.
    ///
    /// PostgREST uses `message`, GoTrue `error_description` or `msg`; anything
    /// else falls back to a body preview.
    pub fn error_message(&self) -> String {
        if let Ok(serde_json::Value::Object(obj)) = serde_json::from_slice(&self.body) {
            for key in ["message", "error_description", "msg", "error"] {
                if let Some(serde_json::Value::String(text)) = obj.get(key) {
                    return text.clone();
                }
            }
        }
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if text.is_empty() {
            return self
                .status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned();
        }
        text.chars().take(MAX_ERROR_PREVIEW).collect()
    }

    /// Map a data endpoint failure; 401/403 are authentication errors.
    pub fn into_data_error(self) -> BackendError {
        let message = self.error_message();
        match self.status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth(message),
            status => BackendError::Status {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Map an auth endpoint failure; every client error is an authentication error.
    pub fn into_auth_error(self) -> BackendError {
        let message = self.error_message();
        if self.status.is_client_error() {
            BackendError::Auth(message)
        } else {
            BackendError::Status {
                status: self.status.as_u16(),
                message,
            }
        }
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, BackendError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

pub(crate) struct HttpTransport {
    client: HttpsClient,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(allow_http: bool, timeout: Duration) -> Result<Self, BackendError> {
        if allow_http {
            tracing::warn!("insecure HTTP enabled; use only with local stacks or mock servers");
        }
        let https = build_https_connector(allow_http)?;
        let client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(https);
        Ok(Self { client, timeout })
    }

    /// Send a request and buffer the whole response, bounded by the request timeout.
    pub async fn send(&self, request: Request<Full<Bytes>>) -> Result<RawResponse, BackendError> {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| BackendError::Transport(e.to_string()))?;
            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| BackendError::Transport(e.to_string()))?
                .to_bytes();
            Ok::<_, BackendError>(RawResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        let response = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| BackendError::Timeout(self.timeout))??;
        tracing::debug!(%method, path = uri.path(), status = response.status.as_u16(), "backend request");
        Ok(response)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_owned()),
        }
    }

    #[test]
    fn error_message_prefers_known_fields() {
        assert_eq!(
            response(400, r#"{"code":"42703","message":"column x does not exist"}"#).error_message(),
            "column x does not exist"
        );
        assert_eq!(
            response(400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .error_message(),
            "Invalid login credentials"
        );
        assert_eq!(response(422, r#"{"msg":"Signup disabled"}"#).error_message(), "Signup disabled");
    }

    #[test]
    fn error_message_falls_back_to_text_or_reason() {
        assert_eq!(response(502, "upstream down\n").error_message(), "upstream down");
        assert_eq!(response(503, "").error_message(), "Service Unavailable");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(response(401, "{}").into_data_error(), BackendError::Auth(_)));
        assert!(matches!(
            response(500, "{}").into_data_error(),
            BackendError::Status { status: 500, .. }
        ));
        assert!(matches!(response(400, "{}").into_auth_error(), BackendError::Auth(_)));
    }
}
