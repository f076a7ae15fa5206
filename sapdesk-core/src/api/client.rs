//! Typed access to the project API
//!
//! `ApiClient` owns a transport and the API prefix. `Resource<T>` is the
//! generic accessor for one collection; the action endpoints (conversions,
//! session sub-resources) hang off the client directly.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;

use super::error::ApiError;
use super::transport::{ApiRequest, Method, Transport};
use crate::models::{ConversionType, Entity, RecordId};
use crate::session_items::Section;

pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Query filters accepted by list endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub project_id: Option<RecordId>,
    pub scenario_id: Option<RecordId>,
    pub analysis_id: Option<RecordId>,
    pub test_type: Option<String>,
    pub classification: Option<String>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, id: impl Into<RecordId>) -> Self {
        self.project_id = Some(id.into());
        self
    }

    pub fn scenario(mut self, id: impl Into<RecordId>) -> Self {
        self.scenario_id = Some(id.into());
        self
    }

    pub fn analysis(mut self, id: impl Into<RecordId>) -> Self {
        self.analysis_id = Some(id.into());
        self
    }

    pub fn test_type(mut self, test_type: impl Into<String>) -> Self {
        self.test_type = Some(test_type.into());
        self
    }

    pub fn classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    /// Query pairs for the set filters only
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(id) = &self.project_id {
            query.push(("project_id".to_string(), id.to_string()));
        }
        if let Some(id) = &self.scenario_id {
            query.push(("scenario_id".to_string(), id.to_string()));
        }
        if let Some(id) = &self.analysis_id {
            query.push(("analysis_id".to_string(), id.to_string()));
        }
        if let Some(t) = &self.test_type {
            query.push(("test_type".to_string(), t.clone()));
        }
        if let Some(c) = &self.classification {
            query.push(("classification".to_string(), c.clone()));
        }
        query
    }
}

/// Body returned by `POST /requirements/{id}/convert`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversionReceipt {
    pub conversion_type: ConversionType,
    pub created_item_id: RecordId,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body returned by `POST /{wricef-items|config-items}/{id}/convert-to-test`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestReceipt {
    #[serde(default)]
    pub test_id: Option<RecordId>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Client for the project API
pub struct ApiClient {
    transport: Box<dyn Transport>,
    prefix: String,
}

impl ApiClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self::with_prefix(transport, DEFAULT_API_PREFIX)
    }

    pub fn with_prefix(transport: Box<dyn Transport>, prefix: &str) -> Self {
        Self {
            transport,
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Typed accessor for one entity collection
    pub fn resource<T: Entity>(&self) -> Resource<'_, T> {
        Resource {
            client: self,
            _marker: PhantomData,
        }
    }

    pub fn path(&self, relative: &str) -> String {
        format!("{}/{}", self.prefix, relative.trim_start_matches('/'))
    }

    /// Sends one request and returns the body of a 2xx response
    pub fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        debug!("[{}] {}", self.transport.name(), request);
        let response = self.transport.execute(&request)?;
        response.into_result()
    }

    pub(crate) fn get_json(&self, relative: &str, query: Vec<(String, String)>) -> Result<Value, ApiError> {
        self.send(ApiRequest::new(Method::Get, self.path(relative)).with_query(query))
    }

    pub(crate) fn write_json<B: Serialize>(
        &self,
        method: Method,
        relative: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let body = serde_json::to_value(body)?;
        self.send(ApiRequest::new(method, self.path(relative)).with_body(body))
    }

    /// Fetches a list endpoint, insisting on an array body
    pub(crate) fn get_rows(&self, relative: &str, query: Vec<(String, String)>) -> Result<Vec<Value>, ApiError> {
        match self.get_json(relative, query)? {
            Value::Array(rows) => Ok(rows),
            other => Err(ApiError::UnexpectedShape(format!(
                "expected a list from {}, got {}",
                relative,
                json_kind(&other)
            ))),
        }
    }

    /// Converts a classified requirement into its delivery artifact
    pub fn convert_requirement(&self, id: &RecordId) -> Result<ConversionReceipt, ApiError> {
        let body = self.send(ApiRequest::new(
            Method::Post,
            self.path(&format!("requirements/{}/convert", id)),
        ))?;
        Ok(serde_json::from_value(body)?)
    }

    /// Creates a unit test case from a WRICEF or config item
    pub fn convert_to_test(&self, collection: &str, id: &RecordId) -> Result<TestReceipt, ApiError> {
        let body = self.send(ApiRequest::new(
            Method::Post,
            self.path(&format!("{}/{}/convert-to-test", collection, id)),
        ))?;
        Ok(serde_json::from_value(body).unwrap_or(TestReceipt {
            test_id: None,
            message: None,
        }))
    }

    /// Lists one section of a session
    pub fn list_section(&self, session_id: &RecordId, section: Section) -> Result<Vec<Value>, ApiError> {
        self.get_rows(&format!("sessions/{}/{}", session_id, section.path()), Vec::new())
    }

    /// Creates an item in one section of a session
    pub fn create_section_item<B: Serialize>(
        &self,
        session_id: &RecordId,
        section: Section,
        draft: &B,
    ) -> Result<Value, ApiError> {
        self.write_json(
            Method::Post,
            &format!("sessions/{}/{}", session_id, section.path()),
            draft,
        )
    }

    /// Replaces the editable fields of one section item
    pub fn update_section_item<B: Serialize>(
        &self,
        section: Section,
        item_id: &RecordId,
        draft: &B,
    ) -> Result<Value, ApiError> {
        self.write_json(Method::Put, &format!("{}/{}", section.path(), item_id), draft)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed accessor for one resource collection
pub struct Resource<'a, T> {
    client: &'a ApiClient,
    _marker: PhantomData<T>,
}

impl<'a, T: Entity> Resource<'a, T> {
    /// Lists the collection in server order
    ///
    /// Rows that do not decode as `T` are skipped with a warning; a body that
    /// is not a list at all is an error.
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<T>, ApiError> {
        let rows = self.client.get_rows(T::COLLECTION, filter.to_query())?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<T>(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed {} row: {}", T::LABEL, e);
                    None
                }
            })
            .collect())
    }

    pub fn get(&self, id: &RecordId) -> Result<T, ApiError> {
        let body = self.client.get_json(&format!("{}/{}", T::COLLECTION, id), Vec::new())?;
        Ok(serde_json::from_value(body)?)
    }

    pub fn create(&self, draft: &T::Draft) -> Result<T, ApiError> {
        let body = self.client.write_json(Method::Post, T::COLLECTION, draft)?;
        Ok(serde_json::from_value(body)?)
    }

    /// Full replace of the editable field set
    pub fn update(&self, id: &RecordId, draft: &T::Draft) -> Result<T, ApiError> {
        let body = self
            .client
            .write_json(Method::Put, &format!("{}/{}", T::COLLECTION, id), draft)?;
        Ok(serde_json::from_value(body)?)
    }

    pub fn delete(&self, id: &RecordId) -> Result<(), ApiError> {
        self.client.send(ApiRequest::new(
            Method::Delete,
            self.client.path(&format!("{}/{}", T::COLLECTION, id)),
        ))?;
        Ok(())
    }
}
