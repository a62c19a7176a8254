//! Field validation helpers for the form payloads in `models`.
//!
//! The payloads derive `validator::Validate`; the rules that need more than the
//! built-in validators live here, along with the 422 field map.

use std::borrow::Cow;
use std::collections::BTreeMap;

use validator::{ValidationError, ValidationErrors};

use crate::localidades::is_valid_localidad;
use crate::models::ReportRequest;

pub const REPORT_REASONS: &[&str] = &[
    "spam",
    "fraude",
    "contenido_inapropiado",
    "informacion_falsa",
    "otro",
];

/// Key under which `validator` files struct-level errors.
const STRUCT_ERRORS: &str = "__all__";

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

pub fn validate_full_name(name: &str) -> Result<(), ValidationError> {
    if char_len(name) < 2 {
        return Err(invalid("full_name", "Ingresá tu nombre."));
    }
    Ok(())
}

/// 8 to 15 digits; spaces, dashes, `+` and parentheses are tolerated.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() {
        return Ok(());
    }
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'));
    if allowed && (8..=15).contains(&digits) {
        Ok(())
    } else {
        Err(invalid("phone", "El teléfono debe tener entre 8 y 15 dígitos."))
    }
}

pub fn validate_locality(locality: &str) -> Result<(), ValidationError> {
    if locality.trim().is_empty() {
        Err(invalid("locality", "Elegí una localidad."))
    } else if !is_valid_localidad(locality) {
        Err(invalid("locality", "Elegí una localidad de la lista."))
    } else {
        Ok(())
    }
}

pub fn validate_report_reason(reason: &str) -> Result<(), ValidationError> {
    if REPORT_REASONS.contains(&reason) {
        Ok(())
    } else {
        Err(invalid("reason", "Elegí un motivo."))
    }
}

/// `otro` needs a description. The error code doubles as the field name.
pub fn validate_report_details(report: &ReportRequest) -> Result<(), ValidationError> {
    let details = report.details.as_deref().map(char_len).unwrap_or(0);
    if report.reason == "otro" && details == 0 {
        return Err(invalid("details", "Contanos qué pasó."));
    }
    Ok(())
}

/// Single-field error for checks that happen in handlers (unknown category, file type).
pub fn field_error(field: &'static str, message: &'static str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(field, invalid(field, message));
    errors
}

/// Field name → user-facing message, first message per field.
///
/// Struct-level errors are filed under the field named by their code.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for (field, field_errors) in errors.field_errors() {
        let field = field.to_string();
        for error in field_errors.iter() {
            let name = if field == STRUCT_ERRORS {
                error.code.to_string()
            } else {
                field.clone()
            };
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            fields.entry(name).or_insert(message);
        }
    }
    fields
}
