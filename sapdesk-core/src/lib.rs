pub mod api;
pub mod config;
pub mod convert;
pub mod error;
pub mod form;
pub mod models;
pub mod session_items;
pub mod view;
pub mod workspace;

// Re-export commonly used types
pub use api::{
    ApiClient, ApiError, ConversionReceipt, ErrorClass, HttpTransport, ListFilter, Resource,
    TestReceipt, Transport,
};
pub use config::{get_config_path, ConsoleConfig};
pub use convert::{can_convert, conversion_target, TestSource};
pub use error::ConsoleError;
pub use form::FormState;
pub use models::{
    Analysis, AnalysisDraft, AnalysisType, Classification, ConfigDraft, ConfigItem, ConfigType,
    ConversionState, ConversionStatus, ConversionType, Entity, Project, ProjectDraft,
    ProjectStatus, RecordId, Requirement, RequirementDraft, Scenario, ScenarioDraft, Session,
    SessionDraft, SourceType, TestCase, TestDraft, TestStatus, TestType, WricefDraft, WricefItem,
    WricefType,
};
pub use session_items::{
    risk_score, ActionDraft, ActionItem, ActionStatus, AgendaDraft, AgendaItem, Attendee,
    AttendeeDraft, Decision, DecisionDraft, FitGapDraft, FitGapItem, Question, QuestionDraft,
    RiskDraft, RiskLevel, RiskOrIssue, Section, SectionItems, SessionItem,
};
pub use view::{Editor, LoadState, Notice, ViewController};
pub use workspace::{Activation, SessionWorkspace, SlotState};
