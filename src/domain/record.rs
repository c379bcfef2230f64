use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use serde_json::Number;

use super::fields::{FieldName, FormFields, RequestType};
use super::lookup::LookupPair;
use crate::errors::{FormError, Result};

/// Item body posted to the destination list.
///
/// Display-only values (CDOA, DSM and the advisor picker selection) are
/// replaced by the identifiers they resolved to and never transmitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRecord {
    #[serde(rename = "CorW")]
    pub cor_w: RequestType,
    #[serde(rename = "StudentName")]
    pub student_name: String,
    #[serde(rename = "StudentID")]
    pub student_id: Number,
    #[serde(rename = "StartDate", serialize_with = "serialize_start_date")]
    pub start_date: NaiveDate,
    #[serde(rename = "Notes", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "DocumentedInNotes", skip_serializing_if = "Option::is_none")]
    pub documented_in_notes: Option<String>,
    #[serde(rename = "InstructorName", skip_serializing_if = "Option::is_none")]
    pub instructor_name: Option<String>,
    #[serde(rename = "ESA", skip_serializing_if = "Option::is_none")]
    pub esa: Option<String>,
    #[serde(rename = "CDOANameId")]
    pub cdoa_name_id: i64,
    #[serde(rename = "CDSMId")]
    pub cdsm_id: i64,
    /// `null` when the advisor could not be resolved.
    #[serde(rename = "AA_x002f_FAAdvisorId")]
    pub aa_fa_advisor_id: Option<i64>,
}

impl SubmissionRecord {
    /// Projects validated form values onto the list item shape.
    ///
    /// Withdrawal-only fields are carried only for withdrawals; values left
    /// behind after switching to Cancel are dropped.
    pub fn build(fields: &FormFields, pair: &LookupPair, advisor_id: Option<i64>) -> Result<Self> {
        let cor_w: RequestType = fields
            .cor_w
            .as_deref()
            .ok_or_else(|| FormError::InvalidInput(format!("{} is missing", FieldName::CorW)))?
            .parse()?;
        let student_id = parse_student_id(&fields.student_id).map_err(FormError::InvalidInput)?;
        let start_date = fields.start_date.ok_or_else(|| {
            FormError::InvalidInput(format!("{} is missing", FieldName::StartDate))
        })?;

        let withdrawal = cor_w == RequestType::Withdrawal;
        let carry = |value: &Option<String>| {
            if withdrawal {
                value.clone()
            } else {
                None
            }
        };

        Ok(Self {
            cor_w,
            student_name: fields.student_name.trim().to_string(),
            student_id,
            start_date,
            notes: carry(&fields.notes),
            documented_in_notes: carry(&fields.documented_in_notes),
            instructor_name: carry(&fields.instructor_name),
            esa: carry(&fields.esa),
            cdoa_name_id: pair.cdoa.id,
            cdsm_id: pair.dsm.id,
            aa_fa_advisor_id: advisor_id,
        })
    }
}

/// Parses a student id typed into a numeric input.
///
/// Whole numbers stay integral on the wire; fractional input is kept as a float.
pub fn parse_student_id(raw: &str) -> std::result::Result<Number, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Student ID Required".into());
    }
    if let Ok(whole) = trimmed.parse::<i64>() {
        return Ok(Number::from(whole));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .and_then(Number::from_f64)
        .ok_or_else(|| "Student ID must be a number".to_string())
}

fn serialize_start_date<S>(date: &NaiveDate, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.format("%Y-%m-%dT00:00:00Z").to_string())
}
