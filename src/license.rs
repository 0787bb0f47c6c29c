//! License server client.
//!
//! Two exchanges per handshake: a certificate GET at playback start, then a
//! license POST per key session. The transport is a generic asynchronous
//! request/response primitive so embedders and tests can substitute their
//! own; the `http` feature provides a reqwest-backed default.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::codec::base64_encode;
use crate::error::{Error, Result};
use crate::handshake::HandshakeConfig;

/// Fixed per-request timeout. Timed-out requests fail their branch; there is
/// no retry.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the caller's credential on certificate requests.
pub const TOKEN_HEADER: &str = "x-drm-token";

/// Method of a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A transport request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Vec<u8>>,
}

/// A transport response. Non-success statuses are data, not errors.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Asynchronous request/response primitive the handshake runs over.
///
/// `Err` is reserved for transport-level failures (connect errors,
/// timeouts); HTTP statuses come back in [`Response`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;
}

/// JSON body of a license request.
#[derive(Debug, Serialize)]
pub struct LicenseRequest<'a> {
    pub token: &'a str,
    #[serde(rename = "contentId")]
    pub content_id: &'a str,
    pub payload: String,
}

/// Client for the certificate and license endpoints of one handshake.
pub struct LicenseClient {
    config: Arc<HandshakeConfig>,
    transport: Arc<dyn Transport>,
}

impl LicenseClient {
    /// Create a client for `config` over `transport`.
    pub fn new(config: Arc<HandshakeConfig>, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Fetch the application certificate.
    ///
    /// Issues `GET <certificate_url>` with the `x-drm-token` header and
    /// expects a binary body. Statuses outside [200, 299] are an error.
    pub async fn fetch_certificate(&self) -> Result<Vec<u8>> {
        let request = Request {
            method: Method::Get,
            url: self.config.certificate_url.clone(),
            headers: vec![(TOKEN_HEADER, self.config.token.clone())],
            body: None,
        };

        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(Error::CertificateStatus {
                status: response.status,
            });
        }
        Ok(response.body)
    }

    /// Exchange a session's key message for license bytes.
    ///
    /// Issues `POST <license_url>` with a JSON body of
    /// `{token, contentId, payload: base64(key_message)}` and expects a
    /// binary body. Statuses outside [200, 299] are an error.
    pub async fn fetch_license(&self, content_id: &str, key_message: &[u8]) -> Result<Vec<u8>> {
        let body = LicenseRequest {
            token: &self.config.token,
            content_id,
            payload: base64_encode(key_message),
        };
        let body = serde_json::to_vec(&body)
            .map_err(|e| Error::Other(format!("Failed to encode license request: {}", e)))?;

        let request = Request {
            method: Method::Post,
            url: self.config.license_url.clone(),
            headers: vec![("Content-Type", "application/json".to_string())],
            body: Some(body),
        };

        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(Error::LicenseStatus {
                status: response.status,
            });
        }
        Ok(response.body)
    }
}

/// Default transport backed by `reqwest`, with [`REQUEST_TIMEOUT`] applied to
/// every request at client construction.
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Build the HTTP transport.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Connect errors and timeouts are transport failures; anything else
    /// stays an HTTP error.
    fn transport_error(err: reqwest::Error) -> Error {
        if err.is_timeout() || err.is_connect() {
            return Error::Transport(err.to_string());
        }
        Error::Http(err)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        let mut builder = match request.method {
            Method::Get => self.client.get(request.url),
            Method::Post => self.client.post(request.url),
        };
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(Self::transport_error)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(Self::transport_error)?
            .to_vec();
        Ok(Response { status, body })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{LicenseClient, LicenseRequest, Method, Request, Response, Transport, TOKEN_HEADER};
    use crate::error::Error;
    use crate::handshake::HandshakeConfig;

    fn test_config() -> Arc<HandshakeConfig> {
        Arc::new(HandshakeConfig {
            token: "test-token".to_string(),
            key_system: "com.apple.fps.1_0".to_string(),
            certificate_url: "https://drm.example/certificate".parse().expect("url"),
            license_url: "https://drm.example/license".parse().expect("url"),
        })
    }

    struct RecordingTransport {
        status: u16,
        body: Vec<u8>,
        seen: Mutex<Vec<Request>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn execute(&self, request: Request) -> crate::error::Result<Response> {
            self.seen.lock().expect("lock").push(request);
            Ok(Response {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    #[test]
    fn license_request_body_shape() {
        let body = LicenseRequest {
            token: "tok",
            content_id: "content42",
            payload: "AQID".to_string(),
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "token": "tok",
                "contentId": "content42",
                "payload": "AQID",
            })
        );
    }

    #[tokio::test]
    async fn certificate_fetch_sends_token_header() {
        let transport = Arc::new(RecordingTransport {
            status: 200,
            body: vec![1, 2, 3],
            seen: Mutex::new(Vec::new()),
        });
        let client = LicenseClient::new(test_config(), transport.clone());

        let certificate = client.fetch_certificate().await.expect("certificate");
        assert_eq!(certificate, vec![1, 2, 3]);

        let seen = transport.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::Get);
        assert_eq!(seen[0].url.as_str(), "https://drm.example/certificate");
        assert_eq!(seen[0].headers, vec![(TOKEN_HEADER, "test-token".to_string())]);
        assert!(seen[0].body.is_none());
    }

    #[tokio::test]
    async fn certificate_fetch_maps_bad_status() {
        let transport = Arc::new(RecordingTransport {
            status: 403,
            body: Vec::new(),
            seen: Mutex::new(Vec::new()),
        });
        let client = LicenseClient::new(test_config(), transport);

        let err = client.fetch_certificate().await.expect_err("status error");
        assert!(matches!(err, Error::CertificateStatus { status: 403 }));
    }

    #[tokio::test]
    async fn license_fetch_posts_json_body() {
        let transport = Arc::new(RecordingTransport {
            status: 200,
            body: b"license-bytes".to_vec(),
            seen: Mutex::new(Vec::new()),
        });
        let client = LicenseClient::new(test_config(), transport.clone());

        let license = client
            .fetch_license("content42", &[1, 2, 3])
            .await
            .expect("license");
        assert_eq!(license, b"license-bytes");

        let seen = transport.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::Post);
        assert_eq!(seen[0].url.as_str(), "https://drm.example/license");
        assert_eq!(
            seen[0].headers,
            vec![("Content-Type", "application/json".to_string())]
        );

        let body: serde_json::Value =
            serde_json::from_slice(seen[0].body.as_ref().expect("body")).expect("json");
        assert_eq!(
            body,
            serde_json::json!({
                "token": "test-token",
                "contentId": "content42",
                "payload": "AQID",
            })
        );
    }

    #[tokio::test]
    async fn license_fetch_maps_bad_status() {
        let transport = Arc::new(RecordingTransport {
            status: 500,
            body: Vec::new(),
            seen: Mutex::new(Vec::new()),
        });
        let client = LicenseClient::new(test_config(), transport);

        let err = client
            .fetch_license("content42", &[1, 2, 3])
            .await
            .expect_err("status error");
        assert!(matches!(err, Error::LicenseStatus { status: 500 }));
    }
}
