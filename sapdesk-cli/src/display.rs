use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use sapdesk_core::session_items::{
    ActionItem, AgendaItem, Attendee, Decision, FitGapItem, Question, RiskOrIssue,
};
use sapdesk_core::{
    Analysis, ConfigItem, Project, RecordId, Requirement, Scenario, Session, TestCase, WricefItem,
};

const MAX_CELL: usize = 40;

/// A record that can be shown as one table row
pub trait Listing {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn id_text(value: &Option<RecordId>) -> String {
    value
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Wire name of an enum value, e.g. `not_started`
fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        Ok(Value::Null) | Err(_) => "-".to_string(),
        Ok(other) => other.to_string(),
    }
}

fn clip(cell: &str) -> String {
    let single_line = cell.replace('\n', " ");
    if single_line.chars().count() <= MAX_CELL {
        return single_line;
    }
    let cut: String = single_line.chars().take(MAX_CELL - 1).collect();
    format!("{}…", cut)
}

/// Prints rows as an aligned table
pub fn print_table<T: Listing>(rows: &[T]) {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.cells().iter().map(|c| clip(c)).collect())
        .collect();

    let widths: Vec<usize> = T::HEADERS
        .iter()
        .enumerate()
        .map(|(i, header)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = T::HEADERS
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = w))
        .collect();
    println!("{}", header.join(" | ").bold());
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)));

    for row in cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = w))
            .collect();
        println!("{}", line.join(" | "));
    }
}

/// Prints every non-empty field of a record
pub fn print_record<T: Serialize>(record: &T) -> Result<()> {
    if let Value::Object(fields) = serde_json::to_value(record)? {
        for (key, value) in fields {
            let shown = match value {
                Value::Null => continue,
                Value::String(s) if s.is_empty() => continue,
                Value::String(s) => s,
                other => other.to_string(),
            };
            if shown.contains('\n') {
                println!("{}:", key.cyan());
                for line in shown.lines() {
                    println!("  {}", line);
                }
            } else {
                println!("{}: {}", key.cyan(), shown);
            }
        }
    }
    Ok(())
}

impl Listing for Project {
    const HEADERS: &'static [&'static str] = &["ID", "Code", "Name", "Customer", "Status", "Go-live"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.code),
            f.name.clone(),
            text(&f.customer_name),
            label(&f.status),
            text(&f.go_live_date),
        ]
    }
}

impl Listing for Scenario {
    const HEADERS: &'static [&'static str] = &["ID", "Scenario", "Name", "Module", "Status", "Project"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.scenario_id),
            f.name.clone(),
            text(&f.module),
            or_dash(&f.status),
            id_text(&f.project_id),
        ]
    }
}

impl Listing for Requirement {
    const HEADERS: &'static [&'static str] =
        &["ID", "Code", "Title", "Class", "Priority", "Status", "Converted"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        let converted = match (self.is_converted(), self.conversion.conversion_type) {
            (true, Some(kind)) => format!(
                "{} {}",
                kind,
                id_text(&self.conversion.conversion_id)
            ),
            (true, None) => "yes".to_string(),
            (false, _) => "-".to_string(),
        };
        vec![
            self.id.to_string(),
            text(&f.code),
            f.title.clone(),
            f.classification
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            text(&f.priority),
            or_dash(&f.status),
            converted,
        ]
    }
}

impl Listing for WricefItem {
    const HEADERS: &'static [&'static str] =
        &["ID", "Code", "Type", "Title", "Status", "Assigned", "Requirement"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.code),
            format!("{} ({})", f.wricef_type, f.wricef_type.describe()),
            f.title.clone(),
            or_dash(&f.status),
            text(&f.assigned_to),
            id_text(&f.requirement_id),
        ]
    }
}

impl Listing for ConfigItem {
    const HEADERS: &'static [&'static str] =
        &["ID", "Code", "Type", "Title", "Status", "T-code", "Requirement"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.code),
            label(&f.config_type),
            f.title.clone(),
            or_dash(&f.status),
            text(&f.t_code),
            id_text(&f.requirement_id),
        ]
    }
}

impl Listing for TestCase {
    const HEADERS: &'static [&'static str] =
        &["ID", "Code", "Title", "Type", "Status", "Source"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        let source = match &f.source_id {
            Some(id) => format!("{} {}", label(&self.provenance()), id),
            None => label(&self.provenance()),
        };
        vec![
            self.id.to_string(),
            text(&f.code),
            f.title.clone(),
            f.test_type.as_str().to_string(),
            label(&f.status),
            source,
        ]
    }
}

impl Listing for Analysis {
    const HEADERS: &'static [&'static str] = &["ID", "Code", "Title", "Type", "Status", "Date"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.code),
            f.title.clone(),
            label(&f.analysis_type),
            or_dash(&f.status),
            text(&f.scheduled_date),
        ]
    }
}

impl Listing for Session {
    const HEADERS: &'static [&'static str] =
        &["ID", "Code", "Name", "Module", "Status", "Facilitator", "Date"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.session_code),
            f.session_name.clone(),
            text(&f.module),
            or_dash(&f.status),
            text(&f.facilitator),
            text(&f.session_date),
        ]
    }
}

impl Listing for Question {
    const HEADERS: &'static [&'static str] = &["ID", "Question", "Answer", "Status", "Assigned"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.text),
            text(&f.answer),
            label(&f.status),
            text(&f.assigned_to),
        ]
    }
}

impl Listing for FitGapItem {
    const HEADERS: &'static [&'static str] = &["ID", "Gap", "Description", "Solution", "Priority", "Status"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.gap_id),
            text(&f.description),
            label(&f.solution_type),
            text(&f.priority),
            text(&f.status),
        ]
    }
}

impl Listing for Decision {
    const HEADERS: &'static [&'static str] = &["ID", "Title", "Impact", "Decided by", "Date"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.title),
            label(&f.impact),
            text(&f.decided_by),
            text(&f.date),
        ]
    }
}

impl Listing for RiskOrIssue {
    const HEADERS: &'static [&'static str] = &["ID", "Type", "Title", "P", "I", "Score", "Owner", "Status"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        let score = match (f.risk_score, self.level()) {
            (Some(score), Some(level)) => format!("{} ({})", score, level),
            _ => "-".to_string(),
        };
        vec![
            self.id.to_string(),
            label(&f.kind),
            text(&f.title.clone().or_else(|| f.description.clone())),
            text(&f.probability),
            text(&f.impact),
            score,
            text(&f.owner),
            text(&f.status),
        ]
    }
}

impl Listing for ActionItem {
    const HEADERS: &'static [&'static str] = &["ID", "Title", "Assigned", "Due", "Status"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        let today = chrono::Local::now().date_naive();
        let status = if self.is_overdue(today) {
            format!("{} (overdue)", label(&f.status))
        } else {
            label(&f.status)
        };
        vec![
            self.id.to_string(),
            text(&f.title),
            text(&f.assigned_to),
            text(&f.due_date),
            status,
        ]
    }
}

impl Listing for Attendee {
    const HEADERS: &'static [&'static str] = &["ID", "Name", "Role", "Department", "Email"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.name),
            text(&f.role),
            text(&f.department),
            text(&f.email),
        ]
    }
}

impl Listing for AgendaItem {
    const HEADERS: &'static [&'static str] = &["ID", "Topic", "Minutes", "Presenter"];

    fn cells(&self) -> Vec<String> {
        let f = &self.fields;
        vec![
            self.id.to_string(),
            text(&f.topic),
            self.duration_minutes()
                .map(|m| m.to_string())
                .unwrap_or_else(|| text(&f.duration)),
            text(&f.presenter),
        ]
    }
}
