//! Binds form fields to input widgets.
//!
//! A [`FieldBinding`] describes one input (label, widget kind, disabled flag).
//! Binding it against the current record yields a [`BoundField`] snapshot
//! carrying the value and the validation message to render; raw widget input
//! flows back through [`FieldBinding::parse_input`].

use std::collections::HashMap;

use chrono::NaiveDate;

use super::lookup::LookupTable;
use super::schema::{ValidationError, ValidationErrors};
use crate::domain::{FieldName, FieldValue, FormFields, PersonSelection, RequestType};

pub const ADVISOR_SELECTION_LIMIT: usize = 1;
pub const ADVISOR_SEARCH_TEXT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub key: String,
    pub text: String,
}

impl DropdownOption {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

/// Fixed Yes / No options of a toggle dropdown.
pub fn toggle_options() -> Vec<DropdownOption> {
    vec![DropdownOption::new("yes", "Yes"), DropdownOption::new("no", "No")]
}

/// Widget used to edit a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Number,
    Date,
    Dropdown(Vec<DropdownOption>),
    Toggle,
    PeoplePicker {
        selection_limit: usize,
        search_text_limit: usize,
    },
}

impl InputKind {
    /// Options offered by dropdown-like widgets.
    pub fn options(&self) -> Vec<DropdownOption> {
        match self {
            InputKind::Dropdown(options) => options.clone(),
            InputKind::Toggle => toggle_options(),
            _ => Vec::new(),
        }
    }
}

/// Maps typed input (key, label or 1-based index) onto dropdown keys.
struct ChoiceMapper {
    keys: Vec<String>,
    alias_to_index: HashMap<String, usize>,
}

impl ChoiceMapper {
    fn from_options(options: &[DropdownOption]) -> Self {
        let mut keys = Vec::new();
        let mut alias_to_index = HashMap::new();
        for (idx, option) in options.iter().enumerate() {
            alias_to_index.insert((idx + 1).to_string(), idx);
            alias_to_index.insert(option.text.to_ascii_lowercase(), idx);
            // Exact keys win over labels that happen to collide.
            alias_to_index.insert(option.key.to_ascii_lowercase(), idx);
            keys.push(option.key.clone());
        }
        Self {
            keys,
            alias_to_index,
        }
    }

    fn resolve(&self, input: &str) -> Option<&str> {
        if let Some(exact) = self.keys.iter().find(|key| key.as_str() == input) {
            return Some(exact.as_str());
        }
        self.alias_to_index
            .get(&input.to_ascii_lowercase())
            .map(|index| self.keys[*index].as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub field: FieldName,
    pub label: &'static str,
    pub kind: InputKind,
    pub disabled: bool,
}

impl FieldBinding {
    pub fn new(field: FieldName, label: &'static str, kind: InputKind) -> Self {
        Self {
            field,
            label,
            kind,
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Snapshot of the field for rendering.
    pub fn bind(&self, fields: &FormFields, errors: &ValidationErrors, required: bool) -> BoundField {
        let value = fields.get(self.field);
        BoundField {
            field: self.field,
            label: self.label,
            display: self.display_value(&value),
            value,
            error: errors.get(&self.field).map(|err| err.message.clone()),
            required,
            disabled: self.disabled,
            kind: self.kind.clone(),
        }
    }

    /// Converts raw widget input into a field value.
    pub fn parse_input(&self, raw: &str) -> Result<FieldValue, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(FieldValue::Empty);
        }
        match &self.kind {
            InputKind::Text | InputKind::Number => Ok(FieldValue::Text(trimmed.to_string())),
            InputKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|_| ValidationError::new("Use YYYY-MM-DD format")),
            InputKind::Dropdown(_) | InputKind::Toggle => {
                let options = self.kind.options();
                let mapper = ChoiceMapper::from_options(&options);
                mapper
                    .resolve(trimmed)
                    .map(|key| FieldValue::Text(key.to_string()))
                    .ok_or_else(|| {
                        let labels: Vec<&str> =
                            options.iter().map(|option| option.text.as_str()).collect();
                        ValidationError::new(format!("Select one of: {}", labels.join(", ")))
                    })
            }
            InputKind::PeoplePicker {
                selection_limit, ..
            } => {
                let people: Vec<PersonSelection> = trimmed
                    .split(';')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(parse_person)
                    .collect();
                if people.len() > *selection_limit {
                    Err(ValidationError::new(format!(
                        "Select at most {} {}",
                        selection_limit,
                        if *selection_limit == 1 { "person" } else { "people" }
                    )))
                } else {
                    Ok(FieldValue::People(people))
                }
            }
        }
    }

    fn display_value(&self, value: &FieldValue) -> String {
        let options = self.kind.options();
        match value.as_text() {
            Some(key) if !options.is_empty() => options
                .iter()
                .find(|option| option.key == key)
                .map(|option| option.text.clone())
                .unwrap_or_else(|| key.to_string()),
            _ => value.to_string(),
        }
    }
}

/// `Name <email>` or a bare email.
fn parse_person(entry: &str) -> PersonSelection {
    match (entry.find('<'), entry.rfind('>')) {
        (Some(open), Some(close)) if open < close => PersonSelection::new(
            entry[..open].trim(),
            entry[open + 1..close].trim(),
        ),
        _ => PersonSelection::new(entry, entry),
    }
}

/// What an input widget needs to render one field.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundField {
    pub field: FieldName,
    pub label: &'static str,
    pub kind: InputKind,
    pub value: FieldValue,
    pub display: String,
    pub error: Option<String>,
    pub required: bool,
    pub disabled: bool,
}

/// Every input of the form in display order, visible or not.
pub fn form_layout(table: Option<&LookupTable>) -> Vec<FieldBinding> {
    let request_types = RequestType::ALL
        .iter()
        .map(|kind| DropdownOption::new(kind.as_str(), kind.as_str()))
        .collect();
    let cdoa_options = table
        .map(|table| {
            table
                .cdoa_options()
                .into_iter()
                .map(|(key, text)| DropdownOption::new(key, text))
                .collect()
        })
        .unwrap_or_default();

    vec![
        FieldBinding::new(FieldName::CorW, "Request Type", InputKind::Dropdown(request_types)),
        FieldBinding::new(FieldName::StudentName, "Student Name", InputKind::Text),
        FieldBinding::new(FieldName::StudentId, "Student ID", InputKind::Number),
        FieldBinding::new(FieldName::StartDate, "Current Start Date", InputKind::Date),
        FieldBinding::new(FieldName::Notes, "Student's Exact Written Request", InputKind::Text),
        FieldBinding::new(FieldName::DocumentedInNotes, "Documented in Notes", InputKind::Toggle),
        FieldBinding::new(FieldName::InstructorName, "Instructor Name", InputKind::Text),
        FieldBinding::new(FieldName::Esa, "ESA", InputKind::Toggle),
        FieldBinding::new(
            FieldName::AaFaAdvisor,
            "Financial Aid Advisor (AA or FA to be notified)",
            InputKind::PeoplePicker {
                selection_limit: ADVISOR_SELECTION_LIMIT,
                search_text_limit: ADVISOR_SEARCH_TEXT_LIMIT,
            },
        ),
        FieldBinding::new(FieldName::Cdoa, "CDOA Name", InputKind::Dropdown(cdoa_options)),
        FieldBinding::new(FieldName::Dsm, "DSM", InputKind::Text).disabled(),
    ]
}
