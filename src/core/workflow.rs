//! Form workflow: owns the record, validates it, and submits it once.

use chrono::{Local, NaiveDate};
use tracing::{error, info, warn};

use super::binder::{form_layout, BoundField, FieldBinding};
use super::identity::IdentityResolver;
use super::lookup::{load_lookup, LookupState};
use super::schema::{Schema, ValidationError, ValidationErrors};
use crate::config::Config;
use crate::domain::{FieldName, FieldValue, FormFields, PersonSelection, SubmissionRecord};
use crate::errors::{FormError, Result};
use crate::sharepoint::ListApi;

pub const EDITING_HEADING: &str = "Cancel / Withdrawal Form";
pub const SUBMITTED_HEADING: &str = "Submitted";
const CDOA_NOT_FOUND: &str = "CDOA selection not found";

/// Endpoints and limits the controller works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSettings {
    pub lookup_list_url: String,
    pub form_list_url: String,
    pub people_search_min_chars: usize,
}

impl From<&Config> for FormSettings {
    fn from(config: &Config) -> Self {
        Self {
            lookup_list_url: config.lookup_list_url.clone(),
            form_list_url: config.form_list_url.clone(),
            people_search_min_chars: config.people_search_min_chars,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Editing,
    /// Terminal for the session.
    Submitted,
}

/// Result of a submit attempt. Failures leave the form in `Editing`.
#[derive(Debug)]
pub enum SubmitOutcome {
    Submitted(SubmissionRecord),
    Invalid(ValidationErrors),
    Failed(FormError),
    AlreadySubmitted,
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

pub struct FormController<A: ListApi> {
    api: A,
    settings: FormSettings,
    schema: Schema,
    fields: FormFields,
    errors: ValidationErrors,
    /// Rejected widget input and unresolvable selections; cleared by a successful set.
    input_errors: ValidationErrors,
    lookup: LookupState,
    phase: FormPhase,
    submit_attempted: bool,
}

impl<A: ListApi> FormController<A> {
    pub fn new(api: A, settings: FormSettings, today: NaiveDate) -> Self {
        Self {
            api,
            settings,
            schema: Schema::cancel_withdrawal(),
            fields: FormFields::new(today),
            errors: ValidationErrors::new(),
            input_errors: ValidationErrors::new(),
            lookup: LookupState::Pending,
            phase: FormPhase::Editing,
            submit_attempted: false,
        }
    }

    /// Controller for `config` with the start date defaulted to today.
    pub fn from_config(api: A, config: &Config) -> Self {
        Self::new(api, FormSettings::from(config), Local::now().date_naive())
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn error(&self, field: FieldName) -> Option<&ValidationError> {
        self.errors.get(&field)
    }

    pub fn lookup(&self) -> &LookupState {
        &self.lookup
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == FormPhase::Submitted
    }

    pub fn heading(&self) -> &'static str {
        match self.phase {
            FormPhase::Editing => EDITING_HEADING,
            FormPhase::Submitted => SUBMITTED_HEADING,
        }
    }

    /// Loads the lookup list once; later calls are no-ops once loaded.
    pub async fn load_lookup(&mut self) -> &LookupState {
        if !self.lookup.is_loaded() {
            self.lookup = load_lookup(&self.api, &self.settings.lookup_list_url).await;
        }
        &self.lookup
    }

    /// Withdrawal-only fields are hidden unless the request is a withdrawal.
    pub fn is_visible(&self, field: FieldName) -> bool {
        !field.is_conditional() || self.fields.is_withdrawal()
    }

    /// Bindings of the currently visible inputs, in display order.
    pub fn bindings(&self) -> Vec<FieldBinding> {
        form_layout(self.lookup.table())
            .into_iter()
            .filter(|binding| self.is_visible(binding.field))
            .collect()
    }

    pub fn binding(&self, field: FieldName) -> Option<FieldBinding> {
        self.bindings()
            .into_iter()
            .find(|binding| binding.field == field)
    }

    pub fn bound_fields(&self) -> Vec<BoundField> {
        self.bindings()
            .iter()
            .map(|binding| {
                let required = self.schema.is_required(binding.field, &self.fields);
                binding.bind(&self.fields, &self.errors, required)
            })
            .collect()
    }

    /// Applies raw widget input to a visible field.
    ///
    /// Returns the field's validation error, if any, after the change.
    pub fn change_input(&mut self, field: FieldName, raw: &str) -> Result<Option<ValidationError>> {
        let Some(binding) = self.binding(field) else {
            return Err(FormError::InvalidInput(format!("{field} is not shown on the form")));
        };
        match binding.parse_input(raw) {
            Ok(value) => self.set_field(field, value),
            Err(err) => {
                if !self.is_submitted() {
                    self.input_errors.insert(field, err.clone());
                    self.errors.insert(field, err.clone());
                }
                Ok(Some(err))
            }
        }
    }

    /// User edit of one field, followed by re-validation.
    pub fn set_field(&mut self, field: FieldName, value: FieldValue) -> Result<Option<ValidationError>> {
        if self.is_submitted() {
            warn!(%field, "form already submitted; change ignored");
            return Ok(None);
        }
        if field == FieldName::Dsm {
            return Err(FormError::InvalidInput(
                "DSM is derived from the CDOA selection".into(),
            ));
        }
        self.fields.set(field, value)?;
        self.input_errors.remove(&field);
        if field == FieldName::Cdoa {
            self.sync_dsm();
        }
        self.revalidate(field);
        Ok(self.errors.get(&field).cloned())
    }

    /// Copies the selected CDOA's DSM title into the read-only DSM field.
    fn sync_dsm(&mut self) {
        let dsm = match (self.lookup.table(), self.fields.cdoa.as_deref()) {
            (Some(table), Some(key)) => match table.resolve_cdoa(key) {
                Ok(pair) => Some(pair.dsm.title.clone()),
                Err(err) => {
                    warn!(%err, "no DSM mapped for CDOA selection");
                    self.input_errors
                        .insert(FieldName::Cdoa, ValidationError::new(CDOA_NOT_FOUND));
                    None
                }
            },
            _ => None,
        };
        // Bypasses the read-only guard in `set_field`.
        self.fields.dsm = dsm;
    }

    fn revalidate(&mut self, changed: FieldName) {
        if self.submit_attempted {
            self.errors = self.full_validation();
            return;
        }
        let mut affected = vec![changed];
        match changed {
            FieldName::CorW => affected.extend(FieldName::CONDITIONAL),
            FieldName::Cdoa => affected.push(FieldName::Dsm),
            _ => {}
        }
        for field in affected {
            // Hidden or untouched fields only report once a submit was attempted.
            let touched = field == changed || self.errors.contains_key(&field);
            let error = self
                .input_errors
                .get(&field)
                .cloned()
                .or_else(|| self.schema.validate_field(field, &self.fields));
            match error {
                Some(err) if touched && self.is_visible(field) => {
                    self.errors.insert(field, err);
                }
                _ => {
                    self.errors.remove(&field);
                }
            }
        }
    }

    /// Full validation, as performed on submit.
    pub fn validate(&mut self) -> &ValidationErrors {
        self.submit_attempted = true;
        self.errors = self.full_validation();
        &self.errors
    }

    /// Schema errors, overridden by pending input errors of visible fields.
    fn full_validation(&self) -> ValidationErrors {
        let mut errors = self.schema.validate(&self.fields);
        for (field, err) in &self.input_errors {
            if self.is_visible(*field) {
                errors.insert(*field, err.clone());
            }
        }
        errors
    }

    /// Directory search backing the advisor people picker.
    ///
    /// Queries shorter than the configured minimum return no suggestions.
    pub async fn search_people(&self, query: &str, limit: usize) -> Result<Vec<PersonSelection>> {
        let query = query.trim();
        if query.chars().count() < self.settings.people_search_min_chars {
            return Ok(Vec::new());
        }
        self.api.search_people(query, limit).await
    }

    /// Validates, resolves lookups, and creates the list item.
    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.is_submitted() {
            return SubmitOutcome::AlreadySubmitted;
        }

        let errors = self.validate().clone();
        if !errors.is_empty() {
            info!(errors = errors.len(), "submission blocked by validation");
            return SubmitOutcome::Invalid(errors);
        }

        let Some(table) = self.lookup.table() else {
            error!("submit attempted before lookup data loaded");
            return SubmitOutcome::Failed(FormError::LookupPending);
        };
        let key = self.fields.cdoa.clone().unwrap_or_default();
        let pair = match table.resolve_cdoa(&key) {
            Ok(pair) => pair.clone(),
            Err(err) => {
                error!(%err, "submission aborted");
                return SubmitOutcome::Failed(err);
            }
        };

        let resolver = IdentityResolver::new(&self.api, &self.settings.form_list_url);
        let advisor_id = resolver.resolve_selection(&self.fields.aa_fa_advisor).await;

        let record = match SubmissionRecord::build(&self.fields, &pair, advisor_id) {
            Ok(record) => record,
            Err(err) => {
                error!(%err, "could not assemble submission");
                return SubmitOutcome::Failed(err);
            }
        };
        let body = match serde_json::to_value(&record) {
            Ok(body) => body,
            Err(err) => return SubmitOutcome::Failed(err.into()),
        };

        match self.api.create_item(&self.settings.form_list_url, &body).await {
            Ok(_) => {
                info!(request_type = %record.cor_w, "cancel / withdrawal request submitted");
                self.phase = FormPhase::Submitted;
                SubmitOutcome::Submitted(record)
            }
            Err(err) => {
                error!(%err, "submission failed");
                SubmitOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LookupPair, LookupRef};
    use crate::sharepoint::SiteUser;
    use async_trait::async_trait;
    use serde_json::{json, Value as JsonValue};
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubApi {
        created: Mutex<Vec<JsonValue>>,
    }

    #[async_trait]
    impl ListApi for StubApi {
        async fn get_items(&self, _url: &str) -> Result<Vec<JsonValue>> {
            Ok(vec![serde_json::to_value(LookupPair::new(
                LookupRef::new(7, "Ann Lee"),
                LookupRef::new(3, "Bo Chan"),
            ))?])
        }

        async fn ensure_user(&self, _list_url: &str, _logon_name: &str) -> Result<SiteUser> {
            Ok(SiteUser {
                id: 42,
                title: None,
                email: None,
            })
        }

        async fn search_people(&self, query: &str, _limit: usize) -> Result<Vec<PersonSelection>> {
            Ok(vec![PersonSelection::new(query, "found@example.edu")])
        }

        async fn create_item(&self, _list_url: &str, body: &JsonValue) -> Result<JsonValue> {
            self.created.lock().unwrap().push(body.clone());
            Ok(json!({"Id": 1}))
        }
    }

    fn settings() -> FormSettings {
        FormSettings {
            lookup_list_url: "/lookup".into(),
            form_list_url: "/_api/web/lists/getbytitle('CW')/items".into(),
            people_search_min_chars: 5,
        }
    }

    fn controller() -> FormController<StubApi> {
        FormController::new(
            StubApi::default(),
            settings(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn conditional_fields_follow_request_type() {
        let mut form = controller();
        form.load_lookup().await;
        assert!(!form.is_visible(FieldName::Notes));
        form.change_input(FieldName::CorW, "Withdrawal").unwrap();
        assert!(form.is_visible(FieldName::Notes));
        assert_eq!(form.bindings().len(), 11);
        form.change_input(FieldName::CorW, "Cancel").unwrap();
        assert_eq!(form.bindings().len(), 7);
    }

    #[tokio::test]
    async fn selecting_cdoa_fills_dsm() {
        let mut form = controller();
        form.load_lookup().await;
        form.change_input(FieldName::Cdoa, "7").unwrap();
        assert_eq!(form.fields().dsm.as_deref(), Some("Bo Chan"));
        assert!(form.set_field(FieldName::Dsm, FieldValue::Text("x".into())).is_err());
    }

    #[tokio::test]
    async fn errors_only_show_for_touched_fields_before_submit() {
        let mut form = controller();
        let err = form.change_input(FieldName::StudentId, "abc").unwrap();
        assert_eq!(err.unwrap().message, "Student ID must be a number");
        assert_eq!(form.errors().len(), 1);
        form.change_input(FieldName::StudentId, "123").unwrap();
        assert!(form.errors().is_empty());
    }

    #[tokio::test]
    async fn short_people_queries_skip_the_directory() {
        let form = controller();
        assert!(form.search_people("sam", 5).await.unwrap().is_empty());
        assert_eq!(form.search_people("samro", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submit_without_lookup_fails_cleanly() {
        let mut form = controller();
        form.change_input(FieldName::CorW, "Cancel").unwrap();
        form.change_input(FieldName::StudentName, "Jane Doe").unwrap();
        form.change_input(FieldName::StudentId, "12345").unwrap();
        form.change_input(FieldName::AaFaAdvisor, "sam@example.edu").unwrap();
        // Without lookup data the CDOA dropdown has no options.
        assert!(form.change_input(FieldName::Cdoa, "7").unwrap().is_some());
        let outcome = form.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
        assert_eq!(form.phase(), FormPhase::Editing);
        assert!(form.api().created.lock().unwrap().is_empty());
    }
}
