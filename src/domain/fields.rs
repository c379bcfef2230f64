use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::common::{Displayable, Keyed};
use crate::errors::FormError;

/// Request type discriminator driving the conditional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    Cancel,
    Withdrawal,
}

impl RequestType {
    pub const ALL: [RequestType; 2] = [RequestType::Cancel, RequestType::Withdrawal];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Cancel => "Cancel",
            RequestType::Withdrawal => "Withdrawal",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = FormError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Cancel" => Ok(RequestType::Cancel),
            "Withdrawal" => Ok(RequestType::Withdrawal),
            other => Err(FormError::InvalidInput(format!(
                "unknown request type `{other}`"
            ))),
        }
    }
}

/// Every field the form collects, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldName {
    CorW,
    StudentName,
    StudentId,
    StartDate,
    Notes,
    DocumentedInNotes,
    InstructorName,
    Esa,
    AaFaAdvisor,
    Cdoa,
    Dsm,
}

impl FieldName {
    pub const ALL: [FieldName; 11] = [
        FieldName::CorW,
        FieldName::StudentName,
        FieldName::StudentId,
        FieldName::StartDate,
        FieldName::Notes,
        FieldName::DocumentedInNotes,
        FieldName::InstructorName,
        FieldName::Esa,
        FieldName::AaFaAdvisor,
        FieldName::Cdoa,
        FieldName::Dsm,
    ];

    /// Fields that only exist for withdrawals.
    pub const CONDITIONAL: [FieldName; 4] = [
        FieldName::Notes,
        FieldName::DocumentedInNotes,
        FieldName::InstructorName,
        FieldName::Esa,
    ];

    /// Internal column name on the destination list.
    pub fn column(self) -> &'static str {
        match self {
            FieldName::CorW => "CorW",
            FieldName::StudentName => "StudentName",
            FieldName::StudentId => "StudentID",
            FieldName::StartDate => "StartDate",
            FieldName::Notes => "Notes",
            FieldName::DocumentedInNotes => "DocumentedInNotes",
            FieldName::InstructorName => "InstructorName",
            FieldName::Esa => "ESA",
            FieldName::AaFaAdvisor => "AA_x002f_FAAdvisor",
            FieldName::Cdoa => "CDOA",
            FieldName::Dsm => "DSM",
        }
    }

    pub fn is_conditional(self) -> bool {
        Self::CONDITIONAL.contains(&self)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One person chosen in the people picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSelection {
    /// Display name.
    pub text: String,
    /// Secondary line shown under the name; the person's email.
    pub secondary_text: String,
}

impl PersonSelection {
    pub fn new(text: impl Into<String>, secondary_text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            secondary_text: secondary_text.into(),
        }
    }
}

impl Keyed for PersonSelection {
    fn key(&self) -> String {
        self.secondary_text.clone()
    }
}

impl Displayable for PersonSelection {
    fn display_label(&self) -> String {
        if self.secondary_text.is_empty() {
            self.text.clone()
        } else {
            format!("{} <{}>", self.text, self.secondary_text)
        }
    }
}

/// Value carried between a bound input and the form state.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Text(String),
    Date(NaiveDate),
    People(Vec<PersonSelection>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Date(_) => false,
            FieldValue::People(people) => people.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            FieldValue::People(people) => {
                let labels: Vec<String> = people.iter().map(|p| p.display_label()).collect();
                f.write_str(&labels.join("; "))
            }
        }
    }
}

/// In-progress record edited through the form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormFields {
    pub cor_w: Option<String>,
    pub student_name: String,
    pub student_id: String,
    pub start_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub documented_in_notes: Option<String>,
    pub instructor_name: Option<String>,
    pub esa: Option<String>,
    pub aa_fa_advisor: Vec<PersonSelection>,
    /// Selected CDOA key, the lookup item id rendered as text.
    pub cdoa: Option<String>,
    /// DSM title derived from the CDOA selection.
    pub dsm: Option<String>,
}

impl FormFields {
    /// Fresh record with the start date defaulted to `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            start_date: Some(today),
            ..Self::default()
        }
    }

    pub fn request_type(&self) -> Option<RequestType> {
        self.cor_w.as_deref().and_then(|raw| raw.parse().ok())
    }

    pub fn is_withdrawal(&self) -> bool {
        self.request_type() == Some(RequestType::Withdrawal)
    }

    pub fn get(&self, field: FieldName) -> FieldValue {
        match field {
            FieldName::CorW => optional_text(&self.cor_w),
            FieldName::StudentName => text(&self.student_name),
            FieldName::StudentId => text(&self.student_id),
            FieldName::StartDate => self
                .start_date
                .map(FieldValue::Date)
                .unwrap_or(FieldValue::Empty),
            FieldName::Notes => optional_text(&self.notes),
            FieldName::DocumentedInNotes => optional_text(&self.documented_in_notes),
            FieldName::InstructorName => optional_text(&self.instructor_name),
            FieldName::Esa => optional_text(&self.esa),
            FieldName::AaFaAdvisor => {
                if self.aa_fa_advisor.is_empty() {
                    FieldValue::Empty
                } else {
                    FieldValue::People(self.aa_fa_advisor.clone())
                }
            }
            FieldName::Cdoa => optional_text(&self.cdoa),
            FieldName::Dsm => optional_text(&self.dsm),
        }
    }

    /// Stores `value` under `field`, rejecting values of the wrong shape.
    pub fn set(&mut self, field: FieldName, value: FieldValue) -> Result<(), FormError> {
        match field {
            FieldName::StartDate => {
                self.start_date = match value {
                    FieldValue::Date(date) => Some(date),
                    FieldValue::Empty => None,
                    other => return Err(shape_error(field, &other)),
                };
            }
            FieldName::AaFaAdvisor => {
                self.aa_fa_advisor = match value {
                    FieldValue::People(people) => people,
                    FieldValue::Empty => Vec::new(),
                    other => return Err(shape_error(field, &other)),
                };
            }
            FieldName::StudentName | FieldName::StudentId => {
                let raw = match value {
                    FieldValue::Text(raw) => raw,
                    FieldValue::Empty => String::new(),
                    other => return Err(shape_error(field, &other)),
                };
                if field == FieldName::StudentName {
                    self.student_name = raw;
                } else {
                    self.student_id = raw;
                }
            }
            _ => {
                let stored = match value {
                    FieldValue::Text(raw) if !raw.trim().is_empty() => Some(raw),
                    FieldValue::Text(_) | FieldValue::Empty => None,
                    other => return Err(shape_error(field, &other)),
                };
                match self.optional_slot(field) {
                    Some(slot) => *slot = stored,
                    None => {
                        return Err(FormError::InvalidInput(format!(
                            "{field} is not a text field"
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    fn optional_slot(&mut self, field: FieldName) -> Option<&mut Option<String>> {
        match field {
            FieldName::CorW => Some(&mut self.cor_w),
            FieldName::Notes => Some(&mut self.notes),
            FieldName::DocumentedInNotes => Some(&mut self.documented_in_notes),
            FieldName::InstructorName => Some(&mut self.instructor_name),
            FieldName::Esa => Some(&mut self.esa),
            FieldName::Cdoa => Some(&mut self.cdoa),
            FieldName::Dsm => Some(&mut self.dsm),
            FieldName::StudentName
            | FieldName::StudentId
            | FieldName::StartDate
            | FieldName::AaFaAdvisor => None,
        }
    }
}

fn text(value: &str) -> FieldValue {
    if value.is_empty() {
        FieldValue::Empty
    } else {
        FieldValue::Text(value.to_string())
    }
}

fn optional_text(value: &Option<String>) -> FieldValue {
    value
        .as_deref()
        .map(text)
        .unwrap_or(FieldValue::Empty)
}

fn shape_error(field: FieldName, value: &FieldValue) -> FormError {
    FormError::InvalidInput(format!("{field} cannot hold {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn new_record_defaults_start_date() {
        let fields = FormFields::new(today());
        assert_eq!(fields.get(FieldName::StartDate), FieldValue::Date(today()));
        assert_eq!(fields.get(FieldName::CorW), FieldValue::Empty);
    }

    #[test]
    fn blank_text_clears_optional_fields() {
        let mut fields = FormFields::new(today());
        fields
            .set(FieldName::Notes, FieldValue::Text("Wants out".into()))
            .unwrap();
        assert_eq!(fields.notes.as_deref(), Some("Wants out"));
        fields
            .set(FieldName::Notes, FieldValue::Text("   ".into()))
            .unwrap();
        assert!(fields.notes.is_none());
    }

    #[test]
    fn rejects_values_of_the_wrong_shape() {
        let mut fields = FormFields::new(today());
        let err = fields
            .set(FieldName::StartDate, FieldValue::Text("soon".into()))
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidInput(_)));
    }

    #[test]
    fn request_type_parses_only_known_keys() {
        let mut fields = FormFields::new(today());
        fields.cor_w = Some("Withdrawal".into());
        assert!(fields.is_withdrawal());
        fields.cor_w = Some("withdrawal".into());
        assert_eq!(fields.request_type(), None);
    }

    #[test]
    fn advisor_column_is_encoded() {
        assert_eq!(FieldName::AaFaAdvisor.column(), "AA_x002f_FAAdvisor");
    }
}
