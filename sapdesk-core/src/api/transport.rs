//! Transport abstraction
//!
//! This module defines the request/response types and the trait that every
//! way of reaching the project API implements (HTTP, in-memory).

use serde_json::Value;
use std::fmt;

use super::error::ApiError;

/// HTTP verbs used by the project API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// One request against the project API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute path including the API prefix, e.g. `/api/v1/requirements`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.query.is_empty() {
            let pairs: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "?{}", pairs.join("&"))?;
        }
        Ok(())
    }
}

/// Status and decoded JSON body of a response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx response into an error, surfacing the server's `detail`
    pub fn into_result(self) -> Result<Value, ApiError> {
        if self.is_success() {
            return Ok(self.body);
        }
        let detail = match &self.body {
            Value::Object(map) => map
                .get("detail")
                .map(|d| match d {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| self.body.to_string()),
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Err(ApiError::Status {
            status: self.status,
            detail,
        })
    }
}

/// Core trait for reaching the project API
///
/// A transport executes exactly one request and reports what came back.
/// It does not retry, deduplicate, or time out on its own.
pub trait Transport: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Executes one request
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_display_includes_query() {
        let req = ApiRequest::new(Method::Get, "/api/v1/requirements").with_query(vec![
            ("project_id".into(), "7".into()),
            ("classification".into(), "Fit".into()),
        ]);
        assert_eq!(
            req.to_string(),
            "GET /api/v1/requirements?project_id=7&classification=Fit"
        );
    }

    #[test]
    fn test_non_success_surfaces_detail() {
        let resp = ApiResponse::new(400, json!({"detail": "Already converted"}));
        match resp.into_result() {
            Err(ApiError::Status { status, detail }) => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Already converted");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_success_passes_body_through() {
        let resp = ApiResponse::new(201, json!({"id": 1}));
        assert_eq!(resp.into_result().unwrap(), json!({"id": 1}));
    }
}
