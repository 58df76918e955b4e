use std::sync::Arc;
use std::time::Duration;

use hyper::ext::ReasonPhrase;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::HttpError;
use crate::storage::CredentialStore;

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway base URL, e.g. `http://localhost:8080`. Paths are appended as-is.
    pub base_url: String,
    /// Name of the credential slot read before every call.
    pub token_key: String,
    /// Optional per-request timeout. None by default; callers own retry and
    /// deadline policy.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token_key: token_key.into(),
            timeout: None,
        }
    }
}

/// Successful call result.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The response declared a JSON body.
    Json(serde_json::Value),
    /// The response succeeded without a JSON body.
    Success,
}

impl Payload {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Success => None,
        }
    }

    /// Decode the JSON body into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        match self {
            Payload::Json(value) => {
                serde_json::from_value(value).map_err(|e| HttpError::invalid_response(0, e))
            }
            Payload::Success => Err(HttpError::invalid_response(0, "response carried no JSON body")),
        }
    }
}

/// Typed client for the gateway.
///
/// Each verb builds one request, dispatches it once and resolves to either a
/// [`Payload`] or a classified [`HttpError`]. No retries are performed.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
}

impl GatewayClient {
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self, HttpError> {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(HttpError::invalid_request)?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get(&self, path: &str) -> Result<Payload, HttpError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Payload, HttpError> {
        let body = encode_body(body)?;
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Payload, HttpError> {
        let body = encode_body(body)?;
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Payload, HttpError> {
        self.send(Method::DELETE, path, None).await
    }

    async fn send(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Payload, HttpError> {
        let url = format!("{}{}", self.config.base_url, path);
        let headers = self.request_headers()?;

        let mut request = self.client.request(method.clone(), &url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        let request = request.build().map_err(HttpError::invalid_request)?;

        tracing::debug!(method = %method, url = %url, "Dispatching request");

        let response = self.client.execute(request).await.map_err(HttpError::network)?;
        process_response(response).await
    }

    fn request_headers(&self) -> Result<HeaderMap, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        if let Some(token) = self.credentials.load(&self.config.token_key) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| HttpError::invalid_request("stored credential is not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, HttpError> {
    serde_json::to_vec(body).map_err(HttpError::invalid_request)
}

/// Resolve a response into a payload or a classified error.
pub async fn process_response(response: Response) -> Result<Payload, HttpError> {
    let status = response.status();
    if !status.is_success() {
        let reason = response
            .extensions()
            .get::<ReasonPhrase>()
            .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());
        let err = HttpError::from_status_reason(status, reason.as_deref());
        tracing::debug!(status = err.status, kind = ?err.kind, "Request failed");
        return Err(err);
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false);

    if !is_json {
        return Ok(Payload::Success);
    }

    let bytes = response.bytes().await.map_err(HttpError::network)?;
    serde_json::from_slice(&bytes)
        .map(Payload::Json)
        .map_err(|e| HttpError::invalid_response(status.as_u16(), e))
}
