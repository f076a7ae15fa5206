//! In-memory transport
//!
//! Behaves like the project API server closely enough to drive the console
//! without a network: collection CRUD with query filters, requirement
//! conversion, convert-to-test, and session sub-resources. Every request is
//! recorded so callers can assert how many fetches actually happened.

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::client::DEFAULT_API_PREFIX;
use super::error::ApiError;
use super::transport::{ApiRequest, ApiResponse, Method, Transport};

#[derive(Default)]
struct MemoryState {
    collections: BTreeMap<String, Vec<Value>>,
    next_id: i64,
    log: Vec<ApiRequest>,
    fail_next: Vec<String>,
    canned: HashMap<String, (u16, Value)>,
}

/// Shared-handle in-memory server; clones see the same data and request log
#[derive(Clone)]
pub struct MemoryTransport {
    prefix: String,
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_API_PREFIX.to_string(),
            state: Arc::new(Mutex::new(MemoryState {
                next_id: 1,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts a record into a collection, assigning an id if it has none
    pub fn seed(&self, collection: &str, record: Value) -> Value {
        let mut state = self.lock();
        let record = state.insert(collection, record);
        record["id"].clone()
    }

    /// Current contents of a collection
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Every request seen so far, oldest first
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().log.clone()
    }

    /// Number of requests with this method and exact path (query ignored)
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    /// Makes the next request to `path` fail at the transport level
    pub fn fail_next(&self, path: &str) {
        self.lock().fail_next.push(path.to_string());
    }

    /// Answers every request to `path` with a fixed status and body
    pub fn respond_with(&self, path: &str, status: u16, body: Value) {
        self.lock().canned.insert(path.to_string(), (status, body));
    }

    pub fn clear_canned(&self, path: &str) {
        self.lock().canned.remove(path);
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut state = self.lock();
        state.log.push(request.clone());

        if let Some(pos) = state.fail_next.iter().position(|p| p == &request.path) {
            state.fail_next.remove(pos);
            return Err(ApiError::Transport(format!(
                "connection reset while requesting {}",
                request.path
            )));
        }
        if let Some((status, body)) = state.canned.get(&request.path) {
            return Ok(ApiResponse::new(*status, body.clone()));
        }

        let relative = match request.path.strip_prefix(&self.prefix) {
            Some(rest) => rest.trim_matches('/'),
            None => return Ok(not_found("Not Found")),
        };
        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        Ok(state.route(request, &segments))
    }
}

fn not_found(detail: &str) -> ApiResponse {
    ApiResponse::new(404, json!({ "detail": detail }))
}

fn bad_request(detail: &str) -> ApiResponse {
    ApiResponse::new(400, json!({ "detail": detail }))
}

fn key_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn id_value(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl MemoryState {
    fn insert(&mut self, collection: &str, record: Value) -> Value {
        let mut map = match record {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if !map.contains_key("id") {
            map.insert("id".into(), Value::from(self.next_id));
            self.next_id += 1;
        }
        map.entry("created_at").or_insert_with(|| Value::String(now()));
        let record = Value::Object(map);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    fn find_mut(&mut self, collection: &str, id: &str) -> Option<&mut Value> {
        self.collections
            .get_mut(collection)?
            .iter_mut()
            .find(|r| key_of(&r["id"]) == id)
    }

    fn find(&self, collection: &str, id: &str) -> Option<&Value> {
        self.collections
            .get(collection)?
            .iter()
            .find(|r| key_of(&r["id"]) == id)
    }

    fn route(&mut self, request: &ApiRequest, segments: &[&str]) -> ApiResponse {
        match (request.method, segments) {
            (Method::Get, [collection]) => self.list(collection, &request.query),
            (Method::Post, [collection]) => {
                let body = request.body.clone().unwrap_or(Value::Null);
                ApiResponse::new(201, self.insert(collection, body))
            }
            (Method::Get, [collection, id]) => match self.find(collection, id) {
                Some(record) => ApiResponse::new(200, record.clone()),
                None => not_found(&format!("{} not found", collection)),
            },
            (Method::Put, [collection, id]) => self.update(collection, id, request.body.as_ref()),
            (Method::Delete, [collection, id]) => self.delete(collection, id),
            (Method::Post, ["requirements", id, "convert"]) => self.convert_requirement(id),
            (Method::Post, [collection, id, "convert-to-test"])
                if *collection == "wricef-items" || *collection == "config-items" =>
            {
                self.convert_to_test(collection, id)
            }
            (Method::Get, ["sessions", session_id, section]) => {
                let query = vec![("session_id".to_string(), session_id.to_string())];
                self.list(section, &query)
            }
            (Method::Post, ["sessions", session_id, section]) => {
                let mut body = match request.body.clone() {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                body.insert("session_id".into(), id_value(session_id));
                ApiResponse::new(201, self.insert(section, Value::Object(body)))
            }
            _ => not_found("Not Found"),
        }
    }

    fn list(&self, collection: &str, query: &[(String, String)]) -> ApiResponse {
        let rows: Vec<Value> = self
            .collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.iter().all(|(k, v)| key_of(&row[k.as_str()]) == *v))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        ApiResponse::new(200, Value::Array(rows))
    }

    fn update(&mut self, collection: &str, id: &str, body: Option<&Value>) -> ApiResponse {
        let Some(record) = self.find_mut(collection, id) else {
            return not_found(&format!("{} not found", collection));
        };
        if let (Value::Object(target), Some(Value::Object(fields))) = (record, body) {
            for (k, v) in fields {
                if k != "id" {
                    target.insert(k.clone(), v.clone());
                }
            }
            target.insert("updated_at".into(), Value::String(now()));
        }
        match self.find(collection, id) {
            Some(updated) => ApiResponse::new(200, updated.clone()),
            None => not_found(&format!("{} not found", collection)),
        }
    }

    fn delete(&mut self, collection: &str, id: &str) -> ApiResponse {
        let Some(rows) = self.collections.get_mut(collection) else {
            return not_found(&format!("{} not found", collection));
        };
        let before = rows.len();
        rows.retain(|r| key_of(&r["id"]) != id);
        if rows.len() == before {
            return not_found(&format!("{} not found", collection));
        }
        ApiResponse::new(200, json!({ "message": format!("{} {} deleted", collection, id) }))
    }

    fn convert_requirement(&mut self, id: &str) -> ApiResponse {
        let Some(req) = self.find("requirements", id).cloned() else {
            return not_found("Requirement not found");
        };
        if req["conversion_status"] == json!("converted") {
            return bad_request("Already converted");
        }

        let config_type = match req["module"].as_str() {
            Some(module) if !module.is_empty() => module.to_string(),
            _ => "standard".to_string(),
        };
        let classification = key_of(&req["classification"]);
        let (conversion_type, collection, artifact) = match classification.trim() {
            "Fit" => (
                "config",
                "config-items",
                json!({
                    "title": req["title"],
                    "config_type": config_type,
                    "description": req["description"],
                    "status": "planned",
                    "project_id": req["project_id"],
                    "requirement_id": req["id"],
                }),
            ),
            "Gap" | "Partial Fit" => (
                "wricef",
                "wricef-items",
                json!({
                    "title": req["title"],
                    "wricef_type": "E",
                    "description": req["description"],
                    "status": "identified",
                    "priority": req["priority"],
                    "project_id": req["project_id"],
                    "requirement_id": req["id"],
                }),
            ),
            other => return bad_request(&format!("Invalid classification: {}", other)),
        };

        let created = self.insert(collection, artifact);
        let created_id = created["id"].clone();
        if let Some(Value::Object(target)) = self.find_mut("requirements", id) {
            target.insert("conversion_status".into(), json!("converted"));
            target.insert("conversion_type".into(), json!(conversion_type));
            target.insert("conversion_id".into(), created_id.clone());
            target.insert("converted_at".into(), Value::String(now()));
        }

        ApiResponse::new(
            200,
            json!({
                "message": "Converted successfully",
                "conversion_type": conversion_type,
                "created_item_id": created_id,
            }),
        )
    }

    fn convert_to_test(&mut self, collection: &str, id: &str) -> ApiResponse {
        let Some(item) = self.find(collection, id).cloned() else {
            return not_found(&format!("{} not found", collection));
        };
        let source_type = if collection == "wricef-items" {
            "wricef"
        } else {
            "config"
        };
        let test = self.insert(
            "tests",
            json!({
                "title": format!("Unit Test: {}", key_of(&item["title"])),
                "test_type": "unit",
                "source_type": source_type,
                "source_id": item["id"],
                "project_id": item["project_id"],
                "status": "not_started",
                "steps": item["unit_test_steps"],
            }),
        );
        ApiResponse::new(
            200,
            json!({ "message": "Test case created", "test_id": test["id"] }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> ApiRequest {
        ApiRequest::new(Method::Get, path)
    }

    #[test]
    fn test_list_filters_by_query() {
        let transport = MemoryTransport::new();
        transport.seed("requirements", json!({"title": "a", "project_id": 7, "classification": "Fit"}));
        transport.seed("requirements", json!({"title": "b", "project_id": 7, "classification": "Gap"}));
        transport.seed("requirements", json!({"title": "c", "project_id": 8, "classification": "Fit"}));

        let resp = transport
            .execute(&get("/api/v1/requirements").with_query(vec![
                ("project_id".into(), "7".into()),
                ("classification".into(), "Fit".into()),
            ]))
            .unwrap();
        let rows = resp.body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], json!("a"));
    }

    #[test]
    fn test_second_conversion_is_rejected() {
        let transport = MemoryTransport::new();
        let id = transport.seed("requirements", json!({"title": "a", "classification": "Gap"}));
        let path = format!("/api/v1/requirements/{}/convert", id);

        let first = transport.execute(&ApiRequest::new(Method::Post, &path)).unwrap();
        assert_eq!(first.status, 200);
        assert_eq!(first.body["conversion_type"], json!("wricef"));
        assert_eq!(transport.records("wricef-items").len(), 1);

        let second = transport.execute(&ApiRequest::new(Method::Post, &path)).unwrap();
        assert_eq!(second.status, 400);
        assert_eq!(transport.records("wricef-items").len(), 1);
    }

    #[test]
    fn test_fail_next_is_one_shot() {
        let transport = MemoryTransport::new();
        transport.fail_next("/api/v1/projects");
        assert!(transport.execute(&get("/api/v1/projects")).is_err());
        assert!(transport.execute(&get("/api/v1/projects")).is_ok());
        assert_eq!(transport.count(Method::Get, "/api/v1/projects"), 2);
    }

    #[test]
    fn test_session_items_are_scoped() {
        let transport = MemoryTransport::new();
        transport
            .execute(
                &ApiRequest::new(Method::Post, "/api/v1/sessions/1/risks")
                    .with_body(json!({"description": "Key user unavailable"})),
            )
            .unwrap();
        let own = transport.execute(&get("/api/v1/sessions/1/risks")).unwrap();
        let other = transport.execute(&get("/api/v1/sessions/2/risks")).unwrap();
        assert_eq!(own.body.as_array().unwrap().len(), 1);
        assert!(other.body.as_array().unwrap().is_empty());
    }
}
