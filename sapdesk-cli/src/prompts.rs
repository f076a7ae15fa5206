use anyhow::{bail, Context, Result};
use inquire::{Confirm, Text};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

fn to_fields<D: Serialize>(draft: &D) -> Result<Map<String, Value>> {
    match serde_json::to_value(draft)? {
        Value::Object(map) => Ok(map),
        other => bail!("Expected an object of fields, got {}", other),
    }
}

/// Values to try for one assignment, most specific first
fn candidates(current: &Value, raw: &str) -> Vec<Value> {
    if raw.trim().is_empty() {
        return vec![Value::Null, Value::String(String::new())];
    }
    if current.is_string() {
        return vec![Value::String(raw.to_string())];
    }
    let mut values = Vec::new();
    if let Ok(parsed @ (Value::Number(_) | Value::Bool(_))) = serde_json::from_str::<Value>(raw.trim()) {
        values.push(parsed);
    }
    values.push(Value::String(raw.to_string()));
    values
}

/// Applies `FIELD=VALUE` assignments to a draft
///
/// Field names are the wire names shown by `show`. An empty value clears an
/// optional field.
pub fn apply_assignments<D>(draft: &D, assignments: &[String]) -> Result<D>
where
    D: Serialize + DeserializeOwned,
{
    let mut fields = to_fields(draft)?;

    for assignment in assignments {
        let (key, raw) = assignment
            .split_once('=')
            .with_context(|| format!("Expected FIELD=VALUE, got '{}'", assignment))?;
        let key = key.trim();
        let Some(current) = fields.get(key).cloned() else {
            let known: Vec<&str> = fields.keys().map(|k| k.as_str()).collect();
            bail!("Unknown field '{}'. Known fields: {}", key, known.join(", "));
        };

        let mut last_error = None;
        for candidate in candidates(&current, raw) {
            fields.insert(key.to_string(), candidate);
            match serde_json::from_value::<D>(Value::Object(fields.clone())) {
                Ok(_) => {
                    last_error = None;
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }
        if let Some(e) = last_error {
            bail!("Invalid value for '{}': {}", key, e);
        }
    }

    serde_json::from_value(Value::Object(fields)).context("Invalid field values")
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Prompts for every field of a draft, keeping the current value on enter
pub fn prompt_fields<D>(draft: &D) -> Result<D>
where
    D: Serialize + DeserializeOwned,
{
    let fields = to_fields(draft)?;
    let mut assignments = Vec::new();

    for (key, value) in &fields {
        let current = as_text(value);
        let answer = Text::new(&format!("{}:", key))
            .with_default(&current)
            .prompt()?;
        if answer != current {
            assignments.push(format!("{}={}", key, answer));
        }
    }

    apply_assignments(draft, &assignments)
}

/// Uses the given assignments, or prompts when there are none
pub fn fill_draft<D>(draft: &D, assignments: &[String]) -> Result<D>
where
    D: Serialize + DeserializeOwned,
{
    if assignments.is_empty() {
        prompt_fields(draft)
    } else {
        apply_assignments(draft, assignments)
    }
}

/// Asks before deleting; defaults to no
pub fn confirm_delete(label: &str) -> Result<bool> {
    Ok(Confirm::new(&format!("Are you sure you want to delete this {}?", label))
        .with_default(false)
        .prompt()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sapdesk_core::{Classification, RecordId, RequirementDraft};
    use sapdesk_core::session_items::RiskDraft;

    fn set(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assignments_use_wire_names_and_types() {
        let draft = apply_assignments(
            &RequirementDraft::default(),
            &set(&["title=Three-way match", "classification=Partial Fit", "project_id=7", "code=123"]),
        )
        .unwrap();
        assert_eq!(draft.title, "Three-way match");
        assert_eq!(draft.classification, Some(Classification::PartialFit));
        assert_eq!(draft.project_id, Some(RecordId::from(7)));
        assert_eq!(draft.code.as_deref(), Some("123"));
    }

    #[test]
    fn test_empty_value_clears_optional_field() {
        let draft = apply_assignments(&RequirementDraft::default(), &set(&["priority="])).unwrap();
        assert_eq!(draft.priority, None);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = apply_assignments(&RequirementDraft::default(), &set(&["colour=red"])).unwrap_err();
        assert!(err.to_string().contains("Unknown field 'colour'"));
    }

    #[test]
    fn test_invalid_enum_value_is_rejected() {
        let err =
            apply_assignments(&RequirementDraft::default(), &set(&["classification=Maybe"])).unwrap_err();
        assert!(err.to_string().contains("classification"));
    }

    #[test]
    fn test_numeric_text_stays_text() {
        let draft = apply_assignments(&RiskDraft::default(), &set(&["probability=4"])).unwrap();
        assert_eq!(draft.probability.as_deref(), Some("4"));
    }
}
