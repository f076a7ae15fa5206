//! Delivery artifacts tracked by the console
//!
//! Every record is split into an identifier, the editable field set (its
//! "draft"), and server-owned metadata. Drafts are what the editor holds and
//! what a save sends back in full.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Reads an explicit `null` as the type's default, the same as a missing key
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Opaque server-assigned identifier
///
/// The project API hands out integers today, but nothing in the console
/// depends on that, so string identifiers are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| RecordId::Text(s.to_string()))
    }
}

impl FromStr for RecordId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(n) => RecordId::Number(n),
            Err(_) => RecordId::Text(s.to_string()),
        })
    }
}

/// A top-level record type managed through a view controller
pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug {
    /// Editable field set; `Default` seeds a new-record editor
    type Draft: Serialize + DeserializeOwned + Clone + PartialEq + Default + fmt::Debug;

    /// Collection segment under the API prefix
    const COLLECTION: &'static str;

    /// Human-readable singular name
    const LABEL: &'static str;

    /// List rows omit long-form text, so the editor re-fetches the full record
    const DETAIL_REFETCH: bool = false;

    fn id(&self) -> &RecordId;

    /// Copies the editable fields out of a persisted record
    fn draft(&self) -> Self::Draft;
}

// =========================================================================
// Enumerations
// =========================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    Completed,
    OnHold,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::Planning => write!(f, "planning"),
            ProjectStatus::Active => write!(f, "active"),
            ProjectStatus::Completed => write!(f, "completed"),
            ProjectStatus::OnHold => write!(f, "on_hold"),
        }
    }
}

/// Fit/gap classification of a requirement against standard capability
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Classification {
    Fit,
    #[serde(rename = "Partial Fit")]
    PartialFit,
    Gap,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Fit => "Fit",
            Classification::PartialFit => "Partial Fit",
            Classification::Gap => "Gap",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "fit" => Ok(Classification::Fit),
            "partial fit" | "partial" => Ok(Classification::PartialFit),
            "gap" => Ok(Classification::Gap),
            other => Err(format!("Invalid classification: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    None,
    Converted,
}

/// Kind of delivery artifact a requirement was converted into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversionType {
    Wricef,
    Config,
}

impl fmt::Display for ConversionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionType::Wricef => write!(f, "wricef"),
            ConversionType::Config => write!(f, "config"),
        }
    }
}

/// WRICEF development-object category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum WricefType {
    W,
    R,
    I,
    C,
    #[default]
    E,
    F,
}

impl WricefType {
    pub fn describe(&self) -> &'static str {
        match self {
            WricefType::W => "Workflow",
            WricefType::R => "Report",
            WricefType::I => "Interface",
            WricefType::C => "Conversion",
            WricefType::E => "Enhancement",
            WricefType::F => "Form",
        }
    }
}

impl fmt::Display for WricefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for WricefType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "W" | "WORKFLOW" => Ok(WricefType::W),
            "R" | "REPORT" => Ok(WricefType::R),
            "I" | "INTERFACE" => Ok(WricefType::I),
            "C" | "CONVERSION" => Ok(WricefType::C),
            "E" | "ENHANCEMENT" => Ok(WricefType::E),
            "F" | "FORM" => Ok(WricefType::F),
            other => Err(format!("Invalid WRICEF type: {}", other)),
        }
    }
}

/// Configuration item category
///
/// A converted Fit requirement is filed under its SAP module (`MM`, `FI`, ...),
/// so values outside the known set are kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum ConfigType {
    #[default]
    Standard,
    Custom,
    Enhancement,
    Other(String),
}

impl ConfigType {
    pub fn as_str(&self) -> &str {
        match self {
            ConfigType::Standard => "standard",
            ConfigType::Custom => "custom",
            ConfigType::Enhancement => "enhancement",
            ConfigType::Other(raw) => raw,
        }
    }
}

impl From<String> for ConfigType {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "standard" => ConfigType::Standard,
            "custom" => ConfigType::Custom,
            "enhancement" => ConfigType::Enhancement,
            _ => ConfigType::Other(raw),
        }
    }
}

impl From<ConfigType> for String {
    fn from(config_type: ConfigType) -> Self {
        config_type.as_str().to_string()
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ConfigType::from(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[default]
    Unit,
    Sit,
    Uat,
    String,
    Sprint,
    Performance,
    Regression,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Unit => "unit",
            TestType::Sit => "sit",
            TestType::Uat => "uat",
            TestType::String => "string",
            TestType::Sprint => "sprint",
            TestType::Performance => "performance",
            TestType::Regression => "regression",
        }
    }
}

impl FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unit" => Ok(TestType::Unit),
            "sit" => Ok(TestType::Sit),
            "uat" => Ok(TestType::Uat),
            "string" => Ok(TestType::String),
            "sprint" => Ok(TestType::Sprint),
            "performance" => Ok(TestType::Performance),
            "regression" => Ok(TestType::Regression),
            other => Err(format!("Invalid test type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    #[default]
    NotStarted,
    InProgress,
    Passed,
    Failed,
    Blocked,
}

/// Where a test case came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Manual,
    Wricef,
    Config,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Workshop,
    Breakdown,
    Review,
}

// =========================================================================
// Project
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectDraft {
    #[serde(rename = "project_code")]
    pub code: Option<String>,
    #[serde(rename = "project_name")]
    pub name: String,
    pub customer_name: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: ProjectStatus,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub go_live_date: Option<String>,
    pub project_manager: Option<String>,
}

impl Default for ProjectDraft {
    fn default() -> Self {
        Self {
            code: None,
            name: String::new(),
            customer_name: None,
            description: None,
            status: ProjectStatus::Planning,
            start_date: None,
            end_date: None,
            go_live_date: None,
            project_manager: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: ProjectDraft,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Entity for Project {
    type Draft = ProjectDraft;
    const COLLECTION: &'static str = "projects";
    const LABEL: &'static str = "project";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn draft(&self) -> ProjectDraft {
        self.fields.clone()
    }
}

// =========================================================================
// Scenario
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScenarioDraft {
    pub project_id: Option<RecordId>,
    pub scenario_id: Option<String>,
    pub name: String,
    pub module: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    pub priority: Option<String>,
}

impl Default for ScenarioDraft {
    fn default() -> Self {
        Self {
            project_id: None,
            scenario_id: None,
            name: String::new(),
            module: None,
            description: None,
            status: "draft".to_string(),
            priority: Some("medium".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: ScenarioDraft,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Entity for Scenario {
    type Draft = ScenarioDraft;
    const COLLECTION: &'static str = "scenarios";
    const LABEL: &'static str = "scenario";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn draft(&self) -> ScenarioDraft {
        self.fields.clone()
    }
}

// =========================================================================
// Requirement
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RequirementDraft {
    pub code: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub classification: Option<Classification>,
    pub module: Option<String>,
    pub priority: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    pub project_id: Option<RecordId>,
    pub scenario_id: Option<RecordId>,
    pub session_id: Option<RecordId>,
}

impl Default for RequirementDraft {
    fn default() -> Self {
        Self {
            code: None,
            title: String::new(),
            description: None,
            classification: Some(Classification::Fit),
            module: None,
            priority: Some("medium".to_string()),
            status: "open".to_string(),
            project_id: None,
            scenario_id: None,
            session_id: None,
        }
    }
}

/// Server-owned conversion bookkeeping; never sent on save
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ConversionState {
    pub conversion_status: Option<ConversionStatus>,
    pub conversion_type: Option<ConversionType>,
    pub conversion_id: Option<RecordId>,
    pub converted_at: Option<String>,
}

impl ConversionState {
    pub fn is_converted(&self) -> bool {
        self.conversion_status == Some(ConversionStatus::Converted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: RequirementDraft,
    #[serde(flatten)]
    pub conversion: ConversionState,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Requirement {
    pub fn is_converted(&self) -> bool {
        self.conversion.is_converted()
    }
}

impl Entity for Requirement {
    type Draft = RequirementDraft;
    const COLLECTION: &'static str = "requirements";
    const LABEL: &'static str = "requirement";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn draft(&self) -> RequirementDraft {
        self.fields.clone()
    }
}

// =========================================================================
// WRICEF item
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WricefDraft {
    pub code: Option<String>,
    pub title: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub wricef_type: WricefType,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    pub priority: Option<String>,
    pub complexity: Option<String>,
    pub assigned_to: Option<String>,
    pub project_id: Option<RecordId>,
    pub requirement_id: Option<RecordId>,
    pub scenario_id: Option<RecordId>,
    pub functional_spec: Option<String>,
    pub technical_spec: Option<String>,
    pub unit_test_steps: Option<String>,
}

impl Default for WricefDraft {
    fn default() -> Self {
        Self {
            code: None,
            title: String::new(),
            description: None,
            wricef_type: WricefType::E,
            status: "identified".to_string(),
            priority: Some("medium".to_string()),
            complexity: None,
            assigned_to: None,
            project_id: None,
            requirement_id: None,
            scenario_id: None,
            functional_spec: None,
            technical_spec: None,
            unit_test_steps: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WricefItem {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: WricefDraft,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Entity for WricefItem {
    type Draft = WricefDraft;
    const COLLECTION: &'static str = "wricef-items";
    const LABEL: &'static str = "WRICEF item";
    const DETAIL_REFETCH: bool = true;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn draft(&self) -> WricefDraft {
        self.fields.clone()
    }
}

// =========================================================================
// Configuration item
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigDraft {
    pub code: Option<String>,
    pub title: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub config_type: ConfigType,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    pub t_code: Option<String>,
    pub config_details: Option<String>,
    pub unit_test_steps: Option<String>,
    pub project_id: Option<RecordId>,
    pub requirement_id: Option<RecordId>,
    pub scenario_id: Option<RecordId>,
}

impl Default for ConfigDraft {
    fn default() -> Self {
        Self {
            code: None,
            title: String::new(),
            description: None,
            config_type: ConfigType::Standard,
            status: "planned".to_string(),
            t_code: None,
            config_details: None,
            unit_test_steps: None,
            project_id: None,
            requirement_id: None,
            scenario_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: ConfigDraft,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Entity for ConfigItem {
    type Draft = ConfigDraft;
    const COLLECTION: &'static str = "config-items";
    const LABEL: &'static str = "config item";
    const DETAIL_REFETCH: bool = true;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn draft(&self) -> ConfigDraft {
        self.fields.clone()
    }
}

// =========================================================================
// Test case
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TestDraft {
    pub code: Option<String>,
    pub title: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub test_type: TestType,
    #[serde(deserialize_with = "null_as_default")]
    pub status: TestStatus,
    pub priority: Option<String>,
    pub preconditions: Option<String>,
    pub steps: Option<String>,
    pub expected_result: Option<String>,
    pub actual_result: Option<String>,
    pub assigned_to: Option<String>,
    pub project_id: Option<RecordId>,
    pub source_type: Option<SourceType>,
    pub source_id: Option<RecordId>,
}

impl Default for TestDraft {
    fn default() -> Self {
        Self {
            code: None,
            title: String::new(),
            description: None,
            test_type: TestType::Unit,
            status: TestStatus::NotStarted,
            priority: Some("medium".to_string()),
            preconditions: None,
            steps: None,
            expected_result: None,
            actual_result: None,
            assigned_to: None,
            project_id: None,
            source_type: Some(SourceType::Manual),
            source_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: TestDraft,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl TestCase {
    /// Provenance of the test; records without a source type were entered by hand
    pub fn provenance(&self) -> SourceType {
        self.fields.source_type.unwrap_or(SourceType::Manual)
    }
}

impl Entity for TestCase {
    type Draft = TestDraft;
    const COLLECTION: &'static str = "tests";
    const LABEL: &'static str = "test case";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn draft(&self) -> TestDraft {
        self.fields.clone()
    }
}

// =========================================================================
// Analysis and session
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisDraft {
    pub code: Option<String>,
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub analysis_type: AnalysisType,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    pub description: Option<String>,
    pub scenario_id: Option<RecordId>,
    pub scheduled_date: Option<String>,
}

impl Default for AnalysisDraft {
    fn default() -> Self {
        Self {
            code: None,
            title: String::new(),
            analysis_type: AnalysisType::Workshop,
            status: "planned".to_string(),
            description: None,
            scenario_id: None,
            scheduled_date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: AnalysisDraft,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Entity for Analysis {
    type Draft = AnalysisDraft;
    const COLLECTION: &'static str = "analyses";
    const LABEL: &'static str = "analysis";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn draft(&self) -> AnalysisDraft {
        self.fields.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionDraft {
    pub session_name: String,
    pub session_code: Option<String>,
    pub module: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    pub analysis_id: Option<RecordId>,
    pub facilitator: Option<String>,
    pub session_date: Option<String>,
    pub notes: Option<String>,
}

impl Default for SessionDraft {
    fn default() -> Self {
        Self {
            session_name: String::new(),
            session_code: None,
            module: None,
            status: "planned".to_string(),
            analysis_id: None,
            facilitator: None,
            session_date: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: SessionDraft,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Entity for Session {
    type Draft = SessionDraft;
    const COLLECTION: &'static str = "sessions";
    const LABEL: &'static str = "session";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn draft(&self) -> SessionDraft {
        self.fields.clone()
    }
}
