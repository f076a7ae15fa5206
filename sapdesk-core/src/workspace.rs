//! Session workspace
//!
//! A session page has seven sections. Each one is fetched the first time it
//! is shown and cached until the page switches to another session. Mutating
//! an item re-fetches only the section it lives in.
//!
//! Fetches are split into `begin_*` and `complete_*` so a caller driving
//! them from another thread can hand results back late. Every ticket carries
//! the workspace generation it was issued under, and a result whose ticket is
//! stale (the session was switched or closed meanwhile) is dropped.

use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;

use crate::api::{ApiClient, ApiError};
use crate::error::ConsoleError;
use crate::models::{RecordId, Session};
use crate::session_items::{Section, SectionItems, SessionItem};

/// Load state of one section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unloaded,
    Loading,
    Loaded,
    Errored,
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    items: SectionItems,
}

/// Permission to deliver one section fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    session_id: RecordId,
    section: Section,
    generation: u64,
}

impl FetchTicket {
    pub fn session_id(&self) -> &RecordId {
        &self.session_id
    }

    pub fn section(&self) -> Section {
        self.section
    }
}

/// Outcome of showing a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Already loaded; no request needed
    Cached,
    /// A fetch for this section is already outstanding
    InFlight,
    /// The caller must run this fetch and complete it
    Fetch(FetchTicket),
}

#[derive(Debug)]
pub struct SessionWorkspace {
    session_id: Option<RecordId>,
    session: Option<Session>,
    generation: u64,
    active: Section,
    slots: HashMap<Section, Slot>,
}

impl Default for SessionWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionWorkspace {
    /// Creates a workspace with no session open
    pub fn new() -> Self {
        Self {
            session_id: None,
            session: None,
            generation: 0,
            active: Section::Questions,
            slots: HashMap::new(),
        }
    }

    pub fn for_session(session_id: RecordId) -> Self {
        let mut workspace = Self::new();
        workspace.switch_session(session_id);
        workspace
    }

    pub fn session_id(&self) -> Option<&RecordId> {
        self.session_id.as_ref()
    }

    /// Header record of the open session, once fetched
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn active_section(&self) -> Section {
        self.active
    }

    pub fn state(&self, section: Section) -> SlotState {
        self.slots
            .get(&section)
            .map(|slot| slot.state)
            .unwrap_or(SlotState::Unloaded)
    }

    /// Items of a section as last fetched; empty until it loads
    pub fn items<T: SessionItem>(&self) -> &[T] {
        self.slots
            .get(&T::SECTION)
            .and_then(|slot| T::items(&slot.items))
            .unwrap_or(&[])
    }

    /// Untyped view of a section's items
    pub fn section_items(&self, section: Section) -> Option<&SectionItems> {
        self.slots.get(&section).map(|slot| &slot.items)
    }

    /// Points the workspace at another session and forgets everything cached
    pub fn switch_session(&mut self, session_id: RecordId) {
        self.generation += 1;
        debug!(
            "Workspace switching to session {} (generation {})",
            session_id, self.generation
        );
        self.session_id = Some(session_id);
        self.session = None;
        self.active = Section::Questions;
        self.slots.clear();
    }

    pub fn close(&mut self) {
        self.generation += 1;
        self.session_id = None;
        self.session = None;
        self.slots.clear();
    }

    fn accepts(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && self.session_id.as_ref() == Some(&ticket.session_id)
    }

    fn issue(&mut self, section: Section) -> Result<FetchTicket, ConsoleError> {
        let session_id = self.session_id.clone().ok_or(ConsoleError::NoSession)?;
        let slot = self.slots.entry(section).or_insert_with(|| Slot {
            state: SlotState::Unloaded,
            items: SectionItems::empty(section),
        });
        slot.state = SlotState::Loading;
        Ok(FetchTicket {
            session_id,
            section,
            generation: self.generation,
        })
    }

    /// Makes a section active and decides whether it needs fetching
    pub fn begin_activate(&mut self, section: Section) -> Result<Activation, ConsoleError> {
        if self.session_id.is_none() {
            return Err(ConsoleError::NoSession);
        }
        self.active = section;
        match self.state(section) {
            SlotState::Loaded => {
                debug!("Section {} served from cache", section);
                Ok(Activation::Cached)
            }
            SlotState::Loading => Ok(Activation::InFlight),
            SlotState::Unloaded | SlotState::Errored => Ok(Activation::Fetch(self.issue(section)?)),
        }
    }

    /// Forces a section back into loading, e.g. after one of its items changed
    pub fn begin_refetch(&mut self, section: Section) -> Result<FetchTicket, ConsoleError> {
        self.issue(section)
    }

    /// Delivers a fetch result; returns false if the ticket was stale
    pub fn complete_fetch(&mut self, ticket: FetchTicket, result: Result<Vec<Value>, ApiError>) -> bool {
        if !self.accepts(&ticket) {
            debug!(
                "Discarding late {} response for session {}",
                ticket.section, ticket.session_id
            );
            return false;
        }

        let slot = match result {
            Ok(rows) => Slot {
                state: SlotState::Loaded,
                items: SectionItems::decode(ticket.section, rows),
            },
            Err(e) => {
                warn!("Failed to load {}: {}", ticket.section.label(), e);
                Slot {
                    state: SlotState::Errored,
                    items: SectionItems::empty(ticket.section),
                }
            }
        };
        self.slots.insert(ticket.section, slot);
        true
    }

    fn run(&mut self, client: &ApiClient, ticket: FetchTicket) {
        let result = client.list_section(&ticket.session_id, ticket.section);
        self.complete_fetch(ticket, result);
    }

    /// Shows a section, fetching it if this is the first time
    pub fn activate(&mut self, client: &ApiClient, section: Section) -> Result<SlotState, ConsoleError> {
        if let Activation::Fetch(ticket) = self.begin_activate(section)? {
            self.run(client, ticket);
        }
        Ok(self.state(section))
    }

    /// Switches to a session and fetches its header record
    ///
    /// A missing header is not fatal; the sections can still be browsed.
    pub fn open(&mut self, client: &ApiClient, session_id: RecordId) -> Option<&Session> {
        self.switch_session(session_id.clone());
        let generation = self.generation;
        match client.resource::<Session>().get(&session_id) {
            Ok(session) if generation == self.generation => {
                info!("Opened session {} ({})", session_id, session.fields.session_name);
                self.session = Some(session);
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to load session {}: {}", session_id, e),
        }
        self.session.as_ref()
    }

    fn refetch(&mut self, client: &ApiClient, section: Section) -> Result<(), ConsoleError> {
        let ticket = self.begin_refetch(section)?;
        self.run(client, ticket);
        Ok(())
    }

    /// Adds an item to its section, then re-fetches that section only
    pub fn create<T: SessionItem>(&mut self, client: &ApiClient, mut draft: T::Draft) -> Result<T, ConsoleError> {
        let session_id = self.session_id.clone().ok_or(ConsoleError::NoSession)?;
        T::before_save(&mut draft);
        let body = client.create_section_item(&session_id, T::SECTION, &draft)?;
        self.refetch(client, T::SECTION)?;
        Ok(serde_json::from_value(body).map_err(ApiError::from)?)
    }

    /// Saves an item's fields, then re-fetches that section only
    pub fn update<T: SessionItem>(
        &mut self,
        client: &ApiClient,
        item_id: &RecordId,
        mut draft: T::Draft,
    ) -> Result<T, ConsoleError> {
        if self.session_id.is_none() {
            return Err(ConsoleError::NoSession);
        }
        T::before_save(&mut draft);
        let body = client.update_section_item(T::SECTION, item_id, &draft)?;
        self.refetch(client, T::SECTION)?;
        Ok(serde_json::from_value(body).map_err(ApiError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, MemoryTransport};
    use crate::session_items::{
        ActionItem, ActionStatus, Question, QuestionDraft, QuestionStatus, RiskDraft, RiskKind,
        RiskOrIssue,
    };
    use serde_json::json;

    fn setup() -> (ApiClient, MemoryTransport) {
        let transport = MemoryTransport::new();
        (ApiClient::new(Box::new(transport.clone())), transport)
    }

    fn path(session: i64, section: Section) -> String {
        format!("/api/v1/sessions/{}/{}", session, section.path())
    }

    #[test]
    fn test_each_section_fetched_once() {
        let (client, transport) = setup();
        transport.seed("questions", json!({"session_id": 5, "question_text": "Who approves?"}));
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));

        assert_eq!(ws.activate(&client, Section::Questions).unwrap(), SlotState::Loaded);
        ws.activate(&client, Section::Risks).unwrap();
        ws.activate(&client, Section::Questions).unwrap();
        ws.activate(&client, Section::Risks).unwrap();

        assert_eq!(transport.count(Method::Get, &path(5, Section::Questions)), 1);
        assert_eq!(transport.count(Method::Get, &path(5, Section::Risks)), 1);
        assert_eq!(ws.items::<Question>().len(), 1);
        assert_eq!(ws.active_section(), Section::Risks);
    }

    #[test]
    fn test_rows_with_null_enums_stay_in_their_section() {
        let (client, transport) = setup();
        transport.seed(
            "questions",
            json!({"session_id": 5, "question_text": "Who approves?", "status": null}),
        );
        transport.seed("actions", json!({"session_id": 5, "title": "Send template", "status": null}));
        transport.seed("risks", json!({"session_id": 5, "type": null, "probability": "2", "impact": "2"}));
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));

        assert_eq!(ws.activate(&client, Section::Questions).unwrap(), SlotState::Loaded);
        ws.activate(&client, Section::Actions).unwrap();
        ws.activate(&client, Section::Risks).unwrap();

        assert_eq!(ws.items::<Question>().len(), 1);
        assert_eq!(ws.items::<Question>()[0].fields.status, QuestionStatus::Open);
        assert_eq!(ws.items::<ActionItem>()[0].fields.status, ActionStatus::Open);
        assert_eq!(ws.items::<RiskOrIssue>()[0].fields.kind, RiskKind::Risk);
    }

    #[test]
    fn test_unvisited_sections_are_never_fetched() {
        let (client, transport) = setup();
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));
        ws.activate(&client, Section::Agenda).unwrap();
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(ws.state(Section::Decisions), SlotState::Unloaded);
    }

    #[test]
    fn test_switching_session_refetches() {
        let (client, transport) = setup();
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));
        ws.activate(&client, Section::FitGap).unwrap();
        ws.switch_session(RecordId::from(6));
        assert_eq!(ws.state(Section::FitGap), SlotState::Unloaded);
        ws.activate(&client, Section::FitGap).unwrap();

        assert_eq!(transport.count(Method::Get, &path(5, Section::FitGap)), 1);
        assert_eq!(transport.count(Method::Get, &path(6, Section::FitGap)), 1);
    }

    #[test]
    fn test_mutation_refetches_only_its_section() {
        let (client, transport) = setup();
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));
        for section in Section::ALL {
            ws.activate(&client, section).unwrap();
        }
        transport.clear_log();

        let draft = RiskDraft {
            description: Some("Key user unavailable".into()),
            probability: Some("3".into()),
            impact: Some("5".into()),
            ..Default::default()
        };
        let created: RiskOrIssue = ws.create(&client, draft).unwrap();
        assert_eq!(created.fields.risk_score, Some(15.0));

        let gets: Vec<String> = transport
            .requests()
            .into_iter()
            .filter(|r| r.method == Method::Get)
            .map(|r| r.path)
            .collect();
        assert_eq!(gets, vec![path(5, Section::Risks)]);
        assert_eq!(ws.items::<RiskOrIssue>().len(), 1);
        assert_eq!(ws.state(Section::Actions), SlotState::Loaded);
    }

    #[test]
    fn test_risk_score_omitted_outside_rating_range() {
        let (client, transport) = setup();
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));
        let draft = RiskDraft {
            probability: Some("7".into()),
            impact: Some("2".into()),
            ..Default::default()
        };
        let _: RiskOrIssue = ws.create(&client, draft).unwrap();
        let stored = &transport.records("risks")[0];
        assert!(stored.get("risk_score").is_none());
    }

    #[test]
    fn test_update_goes_through_item_route() {
        let (client, transport) = setup();
        let id = transport.seed("questions", json!({"session_id": 5, "question_text": "Who approves?"}));
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));
        ws.activate(&client, Section::Questions).unwrap();

        let item_id = RecordId::from(id.as_i64().unwrap());
        let mut draft: QuestionDraft = ws.items::<Question>()[0].draft();
        draft.answer = Some("Finance lead".into());
        let updated: Question = ws.update(&client, &item_id, draft).unwrap();

        assert_eq!(updated.fields.answer.as_deref(), Some("Finance lead"));
        assert_eq!(transport.count(Method::Put, &format!("/api/v1/questions/{}", id)), 1);
        assert_eq!(transport.count(Method::Get, &path(5, Section::Questions)), 2);
        assert_eq!(ws.items::<Question>()[0].fields.answer.as_deref(), Some("Finance lead"));
    }

    #[test]
    fn test_late_response_after_switch_is_ignored() {
        let (_client, _transport) = setup();
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));
        let ticket = match ws.begin_activate(Section::Questions).unwrap() {
            Activation::Fetch(ticket) => ticket,
            other => panic!("expected a fetch, got {:?}", other),
        };

        ws.switch_session(RecordId::from(6));
        let late = vec![json!({"id": 1, "session_id": 5, "question_text": "stale"})];
        assert!(!ws.complete_fetch(ticket, Ok(late)));
        assert!(ws.items::<Question>().is_empty());
        assert_eq!(ws.state(Section::Questions), SlotState::Unloaded);
    }

    #[test]
    fn test_in_flight_section_is_not_fetched_twice() {
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));
        assert!(matches!(ws.begin_activate(Section::Actions).unwrap(), Activation::Fetch(_)));
        assert_eq!(ws.begin_activate(Section::Actions).unwrap(), Activation::InFlight);
    }

    #[test]
    fn test_failed_fetch_is_retried_on_next_activation() {
        let (client, transport) = setup();
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));
        transport.fail_next(&path(5, Section::Actions));

        assert_eq!(ws.activate(&client, Section::Actions).unwrap(), SlotState::Errored);
        assert!(ws.items::<ActionItem>().is_empty());
        assert_eq!(ws.activate(&client, Section::Actions).unwrap(), SlotState::Loaded);
        assert_eq!(transport.count(Method::Get, &path(5, Section::Actions)), 2);
    }

    #[test]
    fn test_failed_create_leaves_section_alone() {
        let (client, transport) = setup();
        let mut ws = SessionWorkspace::for_session(RecordId::from(5));
        ws.activate(&client, Section::Questions).unwrap();
        transport.fail_next(&path(5, Section::Questions));

        let result: Result<Question, _> = ws.create(&client, QuestionDraft::default());
        assert!(matches!(result, Err(ConsoleError::Api(_))));
        assert_eq!(ws.state(Section::Questions), SlotState::Loaded);
        assert_eq!(transport.count(Method::Get, &path(5, Section::Questions)), 1);
    }

    #[test]
    fn test_open_fetches_header() {
        let (client, transport) = setup();
        let id = transport.seed("sessions", json!({"session_name": "OTC workshop 1", "status": "planned"}));
        let mut ws = SessionWorkspace::new();
        let header = ws.open(&client, RecordId::from(id.as_i64().unwrap()));
        assert_eq!(header.unwrap().fields.session_name, "OTC workshop 1");
    }

    #[test]
    fn test_requires_open_session() {
        let (client, _transport) = setup();
        let mut ws = SessionWorkspace::new();
        assert!(matches!(
            ws.activate(&client, Section::Questions),
            Err(ConsoleError::NoSession)
        ));
    }
}
