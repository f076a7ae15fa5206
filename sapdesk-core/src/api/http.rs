//! HTTP transport backed by a blocking reqwest client

use log::debug;
use reqwest::blocking::Client;
use serde_json::Value;

use super::error::ApiError;
use super::transport::{ApiRequest, ApiResponse, Method, Transport};

/// Transport that sends requests to a running project API server
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport for the given server root, e.g. `http://localhost:8000`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        // Requests are never cut short on the client side.
        let client = Client::builder().timeout(None).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("{} -> {}", request, url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let text = response.text()?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(_) if !(200..300).contains(&status) => Value::String(text),
                Err(e) => {
                    return Err(ApiError::UnexpectedShape(format!(
                        "{} returned non-JSON body: {}",
                        request, e
                    )))
                }
            }
        };

        Ok(ApiResponse::new(status, body))
    }
}
