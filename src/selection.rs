use std::collections::BTreeMap;

use crate::config::DEFAULT_DURATION_MINUTES;

/// Drafts for the session log form. Survives failed submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogForm {
    pub plan_id: String,
    pub duration: String,
    pub notes: String,
}

/// Transient, locally owned UI state. Snapshot refreshes never touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    expanded_plan: Option<String>,
    logging_plan: Option<String>,
    duration_draft: String,
    session_notes_draft: String,
    note_editors: BTreeMap<String, String>,
    default_duration: u32,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_MINUTES)
    }
}

impl SelectionState {
    pub fn new(default_duration: u32) -> Self {
        Self {
            expanded_plan: None,
            logging_plan: None,
            duration_draft: default_duration.to_string(),
            session_notes_draft: String::new(),
            note_editors: BTreeMap::new(),
            default_duration,
        }
    }

    pub fn expanded_plan(&self) -> Option<&str> {
        self.expanded_plan.as_deref()
    }

    /// Expands `plan_id`, or collapses it when it is already expanded.
    pub fn toggle_expanded(&mut self, plan_id: &str) {
        if self.expanded_plan.as_deref() == Some(plan_id) {
            self.expanded_plan = None;
        } else {
            self.expanded_plan = Some(plan_id.to_string());
        }
    }

    pub fn logging_plan(&self) -> Option<&str> {
        self.logging_plan.as_deref()
    }

    pub fn is_logging(&self, plan_id: &str) -> bool {
        self.logging_plan.as_deref() == Some(plan_id)
    }

    /// Opens the log form for `plan_id`. Drafts carry over between plans.
    pub fn begin_logging(&mut self, plan_id: &str) {
        self.logging_plan = Some(plan_id.to_string());
    }

    pub fn cancel_logging(&mut self) {
        self.logging_plan = None;
    }

    pub fn set_duration_draft(&mut self, text: &str) {
        self.duration_draft = text.to_string();
    }

    pub fn set_session_notes_draft(&mut self, text: &str) {
        self.session_notes_draft = text.to_string();
    }

    pub fn duration_draft(&self) -> &str {
        &self.duration_draft
    }

    pub fn session_notes_draft(&self) -> &str {
        &self.session_notes_draft
    }

    pub fn log_form(&self) -> Option<LogForm> {
        self.logging_plan.as_ref().map(|plan_id| LogForm {
            plan_id: plan_id.clone(),
            duration: self.duration_draft.clone(),
            notes: self.session_notes_draft.clone(),
        })
    }

    pub fn reset_log_form(&mut self) {
        self.logging_plan = None;
        self.session_notes_draft.clear();
        self.duration_draft = self.default_duration.to_string();
    }

    /// Starts editing with `initial` unless a draft for the plan already exists.
    pub fn open_note_editor(&mut self, plan_id: &str, initial: &str) {
        self.note_editors
            .entry(plan_id.to_string())
            .or_insert_with(|| initial.to_string());
    }

    pub fn edit_note(&mut self, plan_id: &str, text: &str) {
        self.note_editors
            .insert(plan_id.to_string(), text.to_string());
    }

    pub fn close_note_editor(&mut self, plan_id: &str) -> Option<String> {
        self.note_editors.remove(plan_id)
    }

    pub fn note_draft(&self, plan_id: &str) -> Option<&str> {
        self.note_editors.get(plan_id).map(String::as_str)
    }

    pub fn open_note_editors(&self) -> impl Iterator<Item = &str> {
        self.note_editors.keys().map(String::as_str)
    }
}
