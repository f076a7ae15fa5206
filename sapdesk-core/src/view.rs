//! List and editor controller for one entity type
//!
//! A view owns the filtered list for its entity type and at most one open
//! editor. Lists are re-fetched after every successful write; a failed write
//! keeps the editor open with the user's draft intact.
//!
//! Like the session workspace, list and detail fetches come in
//! `begin_*`/`complete_*` pairs. A list result is only accepted if no newer
//! refresh was started since, and a detail result only if the editor it was
//! fetched for is still the open one.

use log::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ConversionReceipt, ListFilter, TestReceipt};
use crate::convert::{self, TestSource, CONVERSION_FAILED, CONVERTED};
use crate::error::ConsoleError;
use crate::form::FormState;
use crate::models::{
    Analysis, ConfigItem, Entity, Project, RecordId, Requirement, Scenario, Session, TestCase,
    WricefItem,
};

/// What the list region shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Empty,
    Populated,
}

/// Outcome message shown inside an editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(m) | Notice::Failure(m) => m,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Notice::Failure(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorId(u64);

/// Open editor: the record being edited (if persisted) and its draft
#[derive(Debug)]
pub struct Editor<E: Entity> {
    id: EditorId,
    record: Option<E>,
    form: FormState<E::Draft>,
    notice: Option<Notice>,
    detail_pending: bool,
}

impl<E: Entity> Editor<E> {
    pub fn id(&self) -> EditorId {
        self.id
    }

    /// Persisted record behind the editor; `None` while creating
    pub fn record(&self) -> Option<&E> {
        self.record.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.record.is_none()
    }

    pub fn form(&self) -> &FormState<E::Draft> {
        &self.form
    }

    pub fn draft(&self) -> &E::Draft {
        self.form.draft()
    }

    pub fn edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut E::Draft),
    {
        self.form.edit(f);
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// True while the full record is still being fetched
    pub fn is_loading_detail(&self) -> bool {
        self.detail_pending
    }
}

/// Permission to deliver one list fetch
#[derive(Debug, Clone)]
pub struct ListTicket {
    generation: u64,
    filter: ListFilter,
}

impl ListTicket {
    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }
}

/// Permission to deliver the full record for one editor
#[derive(Debug, Clone)]
pub struct DetailTicket {
    editor: EditorId,
    record_id: RecordId,
}

impl DetailTicket {
    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }
}

pub const DEFAULT_EMPTY_MESSAGE: &str = "Nothing here yet";

pub struct ViewController<E: Entity> {
    filter: ListFilter,
    rows: Vec<E>,
    state: LoadState,
    list_generation: u64,
    editor: Option<Editor<E>>,
    next_editor: u64,
    empty_message: String,
}

impl<E: Entity> Default for ViewController<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> ViewController<E> {
    pub fn new() -> Self {
        Self {
            filter: ListFilter::new(),
            rows: Vec::new(),
            state: LoadState::Loading,
            list_generation: 0,
            editor: None,
            next_editor: 0,
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
        }
    }

    pub fn with_filter(mut self, filter: ListFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self
    }

    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    /// Replaces the filter; takes effect on the next refresh
    pub fn set_filter(&mut self, filter: ListFilter) {
        self.filter = filter;
    }

    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    pub fn load_state(&self) -> LoadState {
        self.state
    }

    pub fn empty_message(&self) -> &str {
        &self.empty_message
    }

    // ---------------------------------------------------------------------
    // List
    // ---------------------------------------------------------------------

    pub fn begin_refresh(&mut self) -> ListTicket {
        self.list_generation += 1;
        self.state = LoadState::Loading;
        ListTicket {
            generation: self.list_generation,
            filter: self.filter.clone(),
        }
    }

    /// Delivers a list result; returns false if a newer refresh superseded it
    ///
    /// Any failure leaves an empty list rather than stale rows.
    pub fn complete_refresh(&mut self, ticket: ListTicket, result: Result<Vec<E>, ApiError>) -> bool {
        if ticket.generation != self.list_generation {
            debug!("Discarding superseded {} list response", E::LABEL);
            return false;
        }
        self.rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Failed to load {} list: {}", E::LABEL, e);
                Vec::new()
            }
        };
        self.state = if self.rows.is_empty() {
            LoadState::Empty
        } else {
            LoadState::Populated
        };
        true
    }

    /// Re-fetches the list with the current filter
    pub fn refresh(&mut self, client: &ApiClient) -> LoadState {
        let ticket = self.begin_refresh();
        let result = client.resource::<E>().list(&ticket.filter);
        self.complete_refresh(ticket, result);
        self.state
    }

    // ---------------------------------------------------------------------
    // Editor lifecycle
    // ---------------------------------------------------------------------

    pub fn editor(&self) -> Option<&Editor<E>> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut Editor<E>> {
        self.editor.as_mut()
    }

    fn claim(&mut self, record: Option<E>, draft: E::Draft) -> Result<&mut Editor<E>, ConsoleError> {
        if self.editor.is_some() {
            return Err(ConsoleError::EditorBusy(E::LABEL));
        }
        self.next_editor += 1;
        Ok(self.editor.insert(Editor {
            id: EditorId(self.next_editor),
            record,
            form: FormState::new(draft),
            notice: None,
            detail_pending: false,
        }))
    }

    /// Opens a blank editor seeded with the entity's defaults
    pub fn open_new(&mut self) -> Result<&mut Editor<E>, ConsoleError> {
        self.claim(None, E::Draft::default())
    }

    /// Opens a blank editor seeded with the given fields, e.g. a preset parent
    pub fn open_new_with(&mut self, draft: E::Draft) -> Result<&mut Editor<E>, ConsoleError> {
        self.claim(None, draft)
    }

    /// Opens an editor on a list row
    ///
    /// Types whose list rows are abbreviated get a ticket for fetching the
    /// full record; until it arrives the editor shows the row as-is.
    pub fn begin_open(&mut self, record: E) -> Result<Option<DetailTicket>, ConsoleError> {
        let record_id = record.id().clone();
        let draft = record.draft();
        let editor = self.claim(Some(record), draft)?;
        if !E::DETAIL_REFETCH {
            return Ok(None);
        }
        editor.detail_pending = true;
        Ok(Some(DetailTicket {
            editor: editor.id,
            record_id,
        }))
    }

    /// Delivers the full record; returns false if the editor has moved on
    ///
    /// On failure the editor keeps working from the list row.
    pub fn complete_open(&mut self, ticket: DetailTicket, result: Result<E, ApiError>) -> bool {
        let Some(editor) = self.editor.as_mut().filter(|e| e.id == ticket.editor) else {
            debug!("Discarding {} detail for a closed editor", E::LABEL);
            return false;
        };
        editor.detail_pending = false;
        match result {
            Ok(full) => {
                if editor.form.is_dirty() {
                    debug!("Keeping edited draft over fetched {} detail", E::LABEL);
                } else {
                    editor.form.replace(full.draft());
                }
                editor.record = Some(full);
            }
            Err(e) => warn!(
                "Failed to load {} {}, editing list row: {}",
                E::LABEL, ticket.record_id, e
            ),
        }
        true
    }

    /// Opens an editor on `record`, or a blank one if `None`
    pub fn open_editor(&mut self, client: &ApiClient, record: Option<E>) -> Result<&Editor<E>, ConsoleError> {
        match record {
            None => {
                self.open_new()?;
            }
            Some(record) => {
                if let Some(ticket) = self.begin_open(record)? {
                    let result = client.resource::<E>().get(&ticket.record_id);
                    self.complete_open(ticket, result);
                }
            }
        }
        self.editor.as_ref().ok_or(ConsoleError::NoEditor)
    }

    /// Closes the editor, discarding any unsaved draft
    pub fn close_editor(&mut self) -> Option<Editor<E>> {
        self.editor.take()
    }

    fn fail(&mut self, message: String) {
        if let Some(editor) = self.editor.as_mut() {
            editor.notice = Some(Notice::Failure(message));
        }
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    fn write(&self, client: &ApiClient) -> Result<E, ConsoleError> {
        let editor = self.editor.as_ref().ok_or(ConsoleError::NoEditor)?;
        let resource = client.resource::<E>();
        let saved = match editor.record() {
            Some(record) => resource.update(record.id(), editor.draft())?,
            None => resource.create(editor.draft())?,
        };
        Ok(saved)
    }

    /// Sends the draft, reloads the list, and closes the editor
    pub fn save(&mut self, client: &ApiClient) -> Result<E, ConsoleError> {
        match self.write(client) {
            Ok(saved) => {
                info!("Saved {} {}", E::LABEL, saved.id());
                self.editor = None;
                self.refresh(client);
                Ok(saved)
            }
            Err(e) => {
                warn!("Saving {} failed: {}", E::LABEL, e);
                self.fail(format!("Save failed: {}", e));
                Err(e)
            }
        }
    }

    /// Sends the draft but keeps the editor open on the saved record
    pub fn save_in_place(&mut self, client: &ApiClient) -> Result<E, ConsoleError> {
        match self.editor.as_ref() {
            None => return Err(ConsoleError::NoEditor),
            Some(editor) if editor.is_new() => return Err(ConsoleError::NotPersisted(E::LABEL)),
            Some(_) => {}
        }
        match self.write(client) {
            Ok(saved) => {
                info!("Saved {} {}", E::LABEL, saved.id());
                if let Some(editor) = self.editor.as_mut() {
                    editor.form.replace(saved.draft());
                    editor.record = Some(saved.clone());
                    editor.notice = Some(Notice::Success("Saved".to_string()));
                }
                self.refresh(client);
                Ok(saved)
            }
            Err(e) => {
                warn!("Saving {} failed: {}", E::LABEL, e);
                self.fail(format!("Save failed: {}", e));
                Err(e)
            }
        }
    }

    /// Deletes a record; closes the editor if it was open on it
    pub fn delete(&mut self, client: &ApiClient, id: &RecordId) -> Result<(), ConsoleError> {
        match client.resource::<E>().delete(id) {
            Ok(()) => {
                info!("Deleted {} {}", E::LABEL, id);
                if self.editing(id) {
                    self.editor = None;
                }
                self.refresh(client);
                Ok(())
            }
            Err(e) => {
                warn!("Deleting {} {} failed: {}", E::LABEL, id, e);
                if self.editing(id) {
                    self.fail(format!("Delete failed: {}", e));
                }
                Err(e.into())
            }
        }
    }

    fn editing(&self, id: &RecordId) -> bool {
        self.editor
            .as_ref()
            .and_then(|e| e.record())
            .map(|r| r.id() == id)
            .unwrap_or(false)
    }

    fn persisted_mut(&mut self) -> Result<&mut Editor<E>, ConsoleError> {
        let editor = self.editor.as_mut().ok_or(ConsoleError::NoEditor)?;
        if editor.is_new() {
            return Err(ConsoleError::NotPersisted(E::LABEL));
        }
        Ok(editor)
    }
}

impl ViewController<Requirement> {
    /// True when the open editor's requirement may be converted
    pub fn can_convert(&self) -> bool {
        self.editor
            .as_ref()
            .and_then(|e| e.record())
            .map(convert::can_convert)
            .unwrap_or(false)
    }

    /// Converts the requirement in the open editor
    ///
    /// The editor's record is patched in place from the receipt; the list is
    /// re-fetched separately.
    pub fn convert(&mut self, client: &ApiClient) -> Result<ConversionReceipt, ConsoleError> {
        let editor = self.persisted_mut()?;
        let Some(record) = editor.record.as_mut() else {
            return Err(ConsoleError::NotPersisted(Requirement::LABEL));
        };
        match convert::convert_requirement(client, record) {
            Ok(receipt) => {
                editor.notice = Some(Notice::Success(convert::receipt_message(&receipt)));
                self.refresh(client);
                Ok(receipt)
            }
            Err(e @ ConsoleError::NotConvertible { .. }) => Err(e),
            Err(e) => {
                editor.notice = Some(Notice::Failure(CONVERSION_FAILED.to_string()));
                Err(e)
            }
        }
    }
}

impl<E: TestSource> ViewController<E> {
    /// Turns the open item's unit-test steps into a test case
    pub fn convert_to_test(&mut self, client: &ApiClient) -> Result<TestReceipt, ConsoleError> {
        let editor = self.persisted_mut()?;
        let Some(record) = editor.record.as_ref() else {
            return Err(ConsoleError::NotPersisted(E::LABEL));
        };
        match convert::convert_to_test(client, record) {
            Ok(receipt) => {
                editor.notice = Some(Notice::Success(CONVERTED.to_string()));
                Ok(receipt)
            }
            Err(ConsoleError::MissingUnitTest) => Err(ConsoleError::MissingUnitTest),
            Err(e) => {
                editor.notice = Some(Notice::Failure(CONVERSION_FAILED.to_string()));
                Err(e)
            }
        }
    }
}

pub type ProjectView = ViewController<Project>;
pub type ScenarioView = ViewController<Scenario>;
pub type RequirementView = ViewController<Requirement>;
pub type WricefView = ViewController<WricefItem>;
pub type ConfigView = ViewController<ConfigItem>;
pub type TestView = ViewController<TestCase>;
pub type AnalysisView = ViewController<Analysis>;
pub type SessionView = ViewController<Session>;
