use std::collections::BTreeMap;
use std::time::Duration;

use futures_core::future::BoxFuture;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::timeout;

use crate::config::FetchConfig;
use crate::fetch::error::FetchError;

/// Default request header: bodies are JSON.
pub const JSON_HEADER: (&str, &str) = ("content-type", "application/json");

/// Header map holding only [`JSON_HEADER`].
pub fn json_headers() -> BTreeMap<String, String> {
    let (name, value) = JSON_HEADER;
    BTreeMap::from([(name.to_string(), value.to_string())])
}

fn default_method() -> String {
    "GET".to_string()
}

/// Per-request options handed to a [`Transport`].
///
/// `headers` start empty; [`HttpTransport`] sends its configured headers
/// ([`JSON_HEADER`] unless overridden) and lets these win per name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self::default().with_method("POST").with_body(body)
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The network collaborator: performs a request and yields the parsed
/// JSON body, or an error.
pub trait Transport: Send + Sync {
    fn request<'a>(
        &'a self,
        url: &'a str,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<Value, FetchError>>;
}

/// [`Transport`] backed by a reqwest client.
///
/// A non-2xx response is still a response: its body is decoded and
/// returned like any other unless `error_on_status` is configured.
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
    headers: BTreeMap<String, String>,
    error_on_status: bool,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        Self::from_config(&FetchConfig::default())
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds as u64))
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let headers = config
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();

        Ok(Self {
            client,
            timeout: Duration::from_secs(config.timeout_seconds as u64),
            headers,
            error_on_status: config.error_on_status,
        })
    }

    async fn do_request(&self, url: &str, options: &RequestOptions) -> Result<Value, FetchError> {
        let method = Method::from_bytes(options.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("Unsupported method '{}'", options.method)))?;

        // Request headers override configured ones
        let mut headers = self.headers.clone();
        for (name, value) in &options.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }

        let mut builder = self.client.request(method, url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &options.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| FetchError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
            builder = builder.body(bytes);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| FetchError::ConnectionError {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            if self.error_on_status {
                let message = response.text().await.unwrap_or_default();
                return Err(FetchError::UpstreamError {
                    status: status.as_u16(),
                    message,
                });
            }
            tracing::debug!(url = %url, status = status.as_u16(), "Non-success status, decoding body");
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::ConnectionError {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_slice(&bytes).map_err(|e| FetchError::DecodeError {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn request<'a>(
        &'a self,
        url: &'a str,
        options: &'a RequestOptions,
    ) -> BoxFuture<'a, Result<Value, FetchError>> {
        Box::pin(async move {
            match timeout(self.timeout, self.do_request(url, options)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::RequestTimeout {
                    url: url.to_string(),
                    duration: self.timeout.as_secs(),
                }),
            }
        })
    }
}

/// GET `url` and parse the body, outside of any flow.
pub async fn simple_fetch(transport: &dyn Transport, url: &str) -> Result<Value, FetchError> {
    transport.request(url, &RequestOptions::get()).await
}
