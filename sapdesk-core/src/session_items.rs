//! Records owned by a single analysis session
//!
//! A session carries seven independent collections. Each one is reached at
//! `/sessions/{id}/{section}` for list/create and `/{section}/{item_id}` for
//! edits.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{null_as_default, RecordId};

/// One of the seven workspace tabs of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Questions,
    FitGap,
    Decisions,
    Risks,
    Actions,
    Attendees,
    Agenda,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Questions,
        Section::FitGap,
        Section::Decisions,
        Section::Risks,
        Section::Actions,
        Section::Attendees,
        Section::Agenda,
    ];

    /// Path segment used by the project API
    pub fn path(&self) -> &'static str {
        match self {
            Section::Questions => "questions",
            Section::FitGap => "fitgap",
            Section::Decisions => "decisions",
            Section::Risks => "risks",
            Section::Actions => "actions",
            Section::Attendees => "attendees",
            Section::Agenda => "agenda",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Section::Questions => "Questions",
            Section::FitGap => "Fit-Gap",
            Section::Decisions => "Decisions",
            Section::Risks => "Risks",
            Section::Actions => "Actions",
            Section::Attendees => "Attendees",
            Section::Agenda => "Agenda",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', '_'], "");
        Section::ALL
            .iter()
            .copied()
            .find(|section| section.path() == key)
            .or(match key.as_str() {
                "question" => Some(Section::Questions),
                "decision" => Some(Section::Decisions),
                "risk" | "issues" | "issue" => Some(Section::Risks),
                "action" => Some(Section::Actions),
                "attendee" => Some(Section::Attendees),
                _ => None,
            })
            .ok_or_else(|| format!("Unknown session section: {}", s))
    }
}

/// Typed collection held by one workspace slot
#[derive(Debug, Clone, PartialEq)]
pub enum SectionItems {
    Questions(Vec<Question>),
    FitGap(Vec<FitGapItem>),
    Decisions(Vec<Decision>),
    Risks(Vec<RiskOrIssue>),
    Actions(Vec<ActionItem>),
    Attendees(Vec<Attendee>),
    Agenda(Vec<AgendaItem>),
}

impl SectionItems {
    pub fn empty(section: Section) -> Self {
        match section {
            Section::Questions => SectionItems::Questions(Vec::new()),
            Section::FitGap => SectionItems::FitGap(Vec::new()),
            Section::Decisions => SectionItems::Decisions(Vec::new()),
            Section::Risks => SectionItems::Risks(Vec::new()),
            Section::Actions => SectionItems::Actions(Vec::new()),
            Section::Attendees => SectionItems::Attendees(Vec::new()),
            Section::Agenda => SectionItems::Agenda(Vec::new()),
        }
    }

    pub fn section(&self) -> Section {
        match self {
            SectionItems::Questions(_) => Section::Questions,
            SectionItems::FitGap(_) => Section::FitGap,
            SectionItems::Decisions(_) => Section::Decisions,
            SectionItems::Risks(_) => Section::Risks,
            SectionItems::Actions(_) => Section::Actions,
            SectionItems::Attendees(_) => Section::Attendees,
            SectionItems::Agenda(_) => Section::Agenda,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SectionItems::Questions(v) => v.len(),
            SectionItems::FitGap(v) => v.len(),
            SectionItems::Decisions(v) => v.len(),
            SectionItems::Risks(v) => v.len(),
            SectionItems::Actions(v) => v.len(),
            SectionItems::Attendees(v) => v.len(),
            SectionItems::Agenda(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes a list body into the collection type of `section`
    pub fn decode(section: Section, rows: Vec<serde_json::Value>) -> Self {
        match section {
            Section::Questions => SectionItems::Questions(decode_rows(rows)),
            Section::FitGap => SectionItems::FitGap(decode_rows(rows)),
            Section::Decisions => SectionItems::Decisions(decode_rows(rows)),
            Section::Risks => SectionItems::Risks(decode_rows(rows)),
            Section::Actions => SectionItems::Actions(decode_rows(rows)),
            Section::Attendees => SectionItems::Attendees(decode_rows(rows)),
            Section::Agenda => SectionItems::Agenda(decode_rows(rows)),
        }
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<serde_json::Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("Skipping malformed session item: {}", e);
                None
            }
        })
        .collect()
}

/// A record type living under one session section
pub trait SessionItem: Serialize + DeserializeOwned + Clone + fmt::Debug {
    type Draft: Serialize + DeserializeOwned + Clone + PartialEq + Default + fmt::Debug;

    const SECTION: Section;

    fn id(&self) -> &RecordId;

    fn draft(&self) -> Self::Draft;

    /// Fills in fields derived from user input right before a save
    fn before_save(_draft: &mut Self::Draft) {}

    /// Borrows this type's items out of a slot, if the slot holds them
    fn items(collection: &SectionItems) -> Option<&[Self]>;
}

macro_rules! session_item {
    ($item:ident, $draft:ident, $variant:ident) => {
        impl SessionItem for $item {
            type Draft = $draft;
            const SECTION: Section = Section::$variant;

            fn id(&self) -> &RecordId {
                &self.id
            }

            fn draft(&self) -> $draft {
                self.fields.clone()
            }

            fn items(collection: &SectionItems) -> Option<&[Self]> {
                match collection {
                    SectionItems::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

// =========================================================================
// Questions
// =========================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    #[default]
    Open,
    Answered,
    Deferred,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct QuestionDraft {
    pub question_id: Option<String>,
    #[serde(rename = "question_text")]
    pub text: Option<String>,
    #[serde(rename = "answer_text")]
    pub answer: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: QuestionStatus,
    pub category: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: RecordId,
    #[serde(default)]
    pub session_id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: QuestionDraft,
}

session_item!(Question, QuestionDraft, Questions);

// =========================================================================
// Fit-gap items
// =========================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolutionType {
    #[default]
    Standard,
    Config,
    CustomDev,
    Workaround,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FitGapDraft {
    pub gap_id: Option<String>,
    #[serde(rename = "gap_description")]
    pub description: Option<String>,
    pub solution_type: Option<SolutionType>,
    pub priority: Option<String>,
    #[serde(rename = "fit_gap_status")]
    pub status: Option<String>,
    pub process_area: Option<String>,
    pub notes: Option<String>,
}

impl Default for FitGapDraft {
    fn default() -> Self {
        Self {
            gap_id: None,
            description: None,
            solution_type: Some(SolutionType::Standard),
            priority: Some("medium".to_string()),
            status: Some("open".to_string()),
            process_area: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FitGapItem {
    pub id: RecordId,
    #[serde(default)]
    pub session_id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: FitGapDraft,
}

session_item!(FitGapItem, FitGapDraft, FitGap);

// =========================================================================
// Decisions
// =========================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionDraft {
    pub decision_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub impact: Option<Impact>,
    pub decided_by: Option<String>,
    #[serde(rename = "decision_date")]
    pub date: Option<String>,
}

impl Default for DecisionDraft {
    fn default() -> Self {
        Self {
            decision_id: None,
            title: None,
            description: None,
            impact: Some(Impact::Medium),
            decided_by: None,
            date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub id: RecordId,
    #[serde(default)]
    pub session_id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: DecisionDraft,
}

session_item!(Decision, DecisionDraft, Decisions);

// =========================================================================
// Risks and issues
// =========================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskKind {
    #[default]
    Risk,
    Issue,
}

/// Reads a 1-5 rating; anything else is outside the domain
fn parse_rating(value: &str) -> Option<u32> {
    let rating: u32 = value.trim().parse().ok()?;
    (1..=5).contains(&rating).then_some(rating)
}

/// Probability times impact, or `None` when either input is not a 1-5 rating
pub fn risk_score(probability: &str, impact: &str) -> Option<u32> {
    Some(parse_rating(probability)? * parse_rating(impact)?)
}

/// Severity band of a risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 13.0 {
            RiskLevel::High
        } else if score >= 6.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskDraft {
    pub item_id: Option<String>,
    #[serde(rename = "type")]
    #[serde(deserialize_with = "null_as_default")]
    pub kind: RiskKind,
    pub title: Option<String>,
    pub description: Option<String>,
    pub probability: Option<String>,
    pub impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    pub owner: Option<String>,
    pub mitigation_plan: Option<String>,
    pub status: Option<String>,
}

impl Default for RiskDraft {
    fn default() -> Self {
        Self {
            item_id: None,
            kind: RiskKind::Risk,
            title: None,
            description: None,
            probability: Some("1".to_string()),
            impact: Some("1".to_string()),
            risk_score: None,
            owner: None,
            mitigation_plan: None,
            status: Some("open".to_string()),
        }
    }
}

impl RiskDraft {
    /// Score derived from the current probability and impact inputs
    pub fn computed_score(&self) -> Option<u32> {
        risk_score(
            self.probability.as_deref().unwrap_or_default(),
            self.impact.as_deref().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskOrIssue {
    pub id: RecordId,
    #[serde(default)]
    pub session_id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: RiskDraft,
}

impl RiskOrIssue {
    pub fn level(&self) -> Option<RiskLevel> {
        self.fields.risk_score.map(RiskLevel::from_score)
    }
}

impl SessionItem for RiskOrIssue {
    type Draft = RiskDraft;
    const SECTION: Section = Section::Risks;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn draft(&self) -> RiskDraft {
        self.fields.clone()
    }

    // The client owns the derived score at write time; an out-of-domain
    // input drops the field instead of sending a stale value.
    fn before_save(draft: &mut RiskDraft) {
        draft.risk_score = draft.computed_score().map(f64::from);
    }

    fn items(collection: &SectionItems) -> Option<&[Self]> {
        match collection {
            SectionItems::Risks(v) => Some(v),
            _ => None,
        }
    }
}

// =========================================================================
// Action items
// =========================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Open,
    InProgress,
    Completed,
    Overdue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ActionDraft {
    pub action_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: ActionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionItem {
    pub id: RecordId,
    #[serde(default)]
    pub session_id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: ActionDraft,
}

impl ActionItem {
    pub fn due(&self) -> Option<NaiveDate> {
        let raw = self.fields.due_date.as_deref()?;
        // Accept both plain dates and ISO timestamps.
        NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
    }

    /// True when the due date has passed and the action is not completed
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.fields.status {
            ActionStatus::Completed => false,
            ActionStatus::Overdue => true,
            _ => self.due().map(|d| d < today).unwrap_or(false),
        }
    }
}

session_item!(ActionItem, ActionDraft, Actions);

// =========================================================================
// Attendees
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AttendeeDraft {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attendee {
    pub id: RecordId,
    #[serde(default)]
    pub session_id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: AttendeeDraft,
}

session_item!(Attendee, AttendeeDraft, Attendees);

// =========================================================================
// Agenda
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AgendaDraft {
    pub topic: Option<String>,
    /// Free text as entered, e.g. "45" or "45 min"
    pub duration: Option<String>,
    pub presenter: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgendaItem {
    pub id: RecordId,
    #[serde(default)]
    pub session_id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: AgendaDraft,
}

impl AgendaItem {
    pub fn duration_minutes(&self) -> Option<u32> {
        let raw = self.fields.duration.as_deref()?.trim();
        let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

session_item!(AgendaItem, AgendaDraft, Agenda);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_risk_score_over_full_domain() {
        for p in 1..=5u32 {
            for i in 1..=5u32 {
                assert_eq!(risk_score(&p.to_string(), &i.to_string()), Some(p * i));
            }
        }
    }

    #[test]
    fn test_risk_score_outside_domain_is_omitted() {
        assert_eq!(risk_score("high", "3"), None);
        assert_eq!(risk_score("0", "3"), None);
        assert_eq!(risk_score("3", "6"), None);
        assert_eq!(risk_score("", ""), None);
        assert_eq!(risk_score(" 2 ", "4"), Some(8));
    }

    #[test]
    fn test_before_save_sets_or_drops_score() {
        let mut draft = RiskDraft {
            probability: Some("4".into()),
            impact: Some("5".into()),
            ..Default::default()
        };
        RiskOrIssue::before_save(&mut draft);
        assert_eq!(draft.risk_score, Some(20.0));
        let body = serde_json::to_value(&draft).unwrap();
        assert_eq!(body["risk_score"], json!(20.0));
        assert_eq!(body["type"], json!("risk"));

        draft.impact = Some("n/a".into());
        RiskOrIssue::before_save(&mut draft);
        assert_eq!(draft.risk_score, None);
        let body = serde_json::to_value(&draft).unwrap();
        assert!(body.get("risk_score").is_none());
    }

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_score(25.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(13.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(6.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(5.0), RiskLevel::Low);
    }

    #[test]
    fn test_section_parsing_and_paths() {
        assert_eq!("fit-gap".parse::<Section>().unwrap(), Section::FitGap);
        assert_eq!("Risks".parse::<Section>().unwrap(), Section::Risks);
        assert_eq!("issue".parse::<Section>().unwrap(), Section::Risks);
        assert!("minutes".parse::<Section>().is_err());
        assert_eq!(Section::FitGap.path(), "fitgap");
        assert_eq!(Section::ALL.len(), 7);
    }

    #[test]
    fn test_question_wire_names() {
        let q: Question = serde_json::from_value(json!({
            "id": 5,
            "session_id": 2,
            "question_text": "Who approves?",
            "answer_text": null,
            "status": "deferred"
        }))
        .unwrap();
        assert_eq!(q.fields.text.as_deref(), Some("Who approves?"));
        assert_eq!(q.fields.status, QuestionStatus::Deferred);
        let body = serde_json::to_value(q.draft()).unwrap();
        assert_eq!(body["question_text"], json!("Who approves?"));
    }

    #[test]
    fn test_decode_skips_malformed_rows() {
        let items = SectionItems::decode(
            Section::Decisions,
            vec![json!({"id": 1, "title": "Use standard"}), json!("garbage")],
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items.section(), Section::Decisions);
    }

    #[test]
    fn test_action_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut action: ActionItem = serde_json::from_value(json!({
            "id": 1,
            "title": "Send spec",
            "due_date": "2024-05-30",
            "status": "open"
        }))
        .unwrap();
        assert!(action.is_overdue(today));
        action.fields.status = ActionStatus::Completed;
        assert!(!action.is_overdue(today));
        action.fields.status = ActionStatus::InProgress;
        action.fields.due_date = Some("2024-06-10T00:00:00".into());
        assert!(!action.is_overdue(today));
    }

    #[test]
    fn test_agenda_duration_minutes() {
        let item: AgendaItem =
            serde_json::from_value(json!({"id": 1, "topic": "Intro", "duration": "45 min"}))
                .unwrap();
        assert_eq!(item.duration_minutes(), Some(45));
    }
}
