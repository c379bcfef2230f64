//! Declarative validation rules for the cancel / withdrawal form.
//!
//! Each rule is tagged with a [`Condition`] evaluated against the whole
//! record, so a field can become mandatory depending on a sibling's value.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::record::parse_student_id;
use crate::domain::{FieldName, FieldValue, FormFields, RequestType};

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors keyed by field, at most one per field.
pub type ValidationErrors = BTreeMap<FieldName, ValidationError>;

type ValidatorCallback = dyn Fn(&FieldValue) -> Result<(), String> + Send + Sync;

/// Built-in checks applied to a single field value.
#[derive(Clone)]
pub enum Validator {
    /// Non-blank value; the message is reported when missing.
    Required(&'static str),
    /// Required text of at least `min` characters.
    MinLength {
        min: usize,
        missing: &'static str,
        too_short: &'static str,
    },
    /// Required number.
    Numeric,
    /// Required calendar date.
    Date(&'static str),
    /// Required value drawn from a closed set.
    OneOf {
        options: Vec<String>,
        message: &'static str,
    },
    Custom(Arc<ValidatorCallback>),
}

impl Validator {
    pub fn validate(&self, value: &FieldValue) -> Result<(), ValidationError> {
        match self {
            Validator::Required(message) => {
                if value.is_empty() {
                    Err(ValidationError::new(*message))
                } else {
                    Ok(())
                }
            }
            Validator::MinLength {
                min,
                missing,
                too_short,
            } => {
                let text = value.as_text().map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    Err(ValidationError::new(*missing))
                } else if text.chars().count() < *min {
                    Err(ValidationError::new(*too_short))
                } else {
                    Ok(())
                }
            }
            Validator::Numeric => {
                let raw = value.as_text().unwrap_or_default();
                parse_student_id(raw)
                    .map(|_| ())
                    .map_err(ValidationError::new)
            }
            Validator::Date(message) => match value {
                FieldValue::Date(_) => Ok(()),
                FieldValue::Text(raw) if NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").is_ok() => {
                    Ok(())
                }
                _ => Err(ValidationError::new(*message)),
            },
            Validator::OneOf { options, message } => match value.as_text() {
                Some(text) if options.iter().any(|option| option == text) => Ok(()),
                _ => Err(ValidationError::new(*message)),
            },
            Validator::Custom(func) => func(value).map_err(ValidationError::new),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Required(message) => f.debug_tuple("Required").field(message).finish(),
            Validator::MinLength { min, .. } => {
                f.debug_struct("MinLength").field("min", min).finish()
            }
            Validator::Numeric => f.write_str("Numeric"),
            Validator::Date(message) => f.debug_tuple("Date").field(message).finish(),
            Validator::OneOf { options, .. } => f.debug_tuple("OneOf").field(options).finish(),
            Validator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// When a rule is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    WhenRequestType(RequestType),
}

impl Condition {
    pub fn holds(self, fields: &FormFields) -> bool {
        match self {
            Condition::Always => true,
            Condition::WhenRequestType(expected) => fields.request_type() == Some(expected),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub field: FieldName,
    pub condition: Condition,
    pub validator: Validator,
}

impl Rule {
    pub fn new(field: FieldName, validator: Validator) -> Self {
        Self {
            field,
            condition: Condition::Always,
            validator,
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }
}

/// Ordered rule list evaluated against a full record.
#[derive(Debug, Clone)]
pub struct Schema {
    rules: Vec<Rule>,
}

impl Schema {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Rules of the cancel / withdrawal form.
    pub fn cancel_withdrawal() -> Self {
        let withdrawal = Condition::WhenRequestType(RequestType::Withdrawal);
        Self::new(vec![
            Rule::new(FieldName::AaFaAdvisor, Validator::Required("AAFA Advisor is required")),
            Rule::new(FieldName::Cdoa, Validator::Required("CDOA is required")),
            Rule::new(FieldName::Dsm, Validator::Required("DSM is required")),
            Rule::new(
                FieldName::CorW,
                Validator::OneOf {
                    options: RequestType::ALL
                        .iter()
                        .map(|kind| kind.as_str().to_string())
                        .collect(),
                    message: "Cancel or Withdrawal",
                },
            ),
            Rule::new(FieldName::StudentId, Validator::Numeric),
            Rule::new(
                FieldName::StudentName,
                Validator::MinLength {
                    min: 2,
                    missing: "Student Name required",
                    too_short: "Full Name Required",
                },
            ),
            Rule::new(FieldName::StartDate, Validator::Date("Start Date Required")),
            Rule::new(FieldName::Notes, Validator::Required("Notes Required (Withdrawal)"))
                .when(withdrawal),
            Rule::new(
                FieldName::DocumentedInNotes,
                Validator::Required("Required (Withdrawal)"),
            )
            .when(withdrawal),
            Rule::new(
                FieldName::InstructorName,
                Validator::Required("Instructor Name Required (Withdrawal)"),
            )
            .when(withdrawal),
            Rule::new(FieldName::Esa, Validator::Required("ESA Required (Withdrawal)"))
                .when(withdrawal),
        ])
    }

    /// Whether `field` must be filled in for the current record.
    pub fn is_required(&self, field: FieldName, fields: &FormFields) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.field == field && rule.condition.holds(fields))
    }

    /// Runs every active rule; the first failure per field wins.
    pub fn validate(&self, fields: &FormFields) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for rule in &self.rules {
            if errors.contains_key(&rule.field) || !rule.condition.holds(fields) {
                continue;
            }
            if let Err(err) = rule.validator.validate(&fields.get(rule.field)) {
                errors.insert(rule.field, err);
            }
        }
        errors
    }

    /// Validates a single field in the context of the full record.
    pub fn validate_field(&self, field: FieldName, fields: &FormFields) -> Option<ValidationError> {
        let value = fields.get(field);
        self.rules
            .iter()
            .filter(|rule| rule.field == field && rule.condition.holds(fields))
            .find_map(|rule| rule.validator.validate(&value).err())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::cancel_withdrawal()
    }
}
