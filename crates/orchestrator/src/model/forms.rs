//! Form definitions and submission handling.
//!
//! A task (or start event) references a form definition by key; the
//! submitted values are extracted into typed process variables before the
//! engine commit. Extraction is strict: values that do not match the
//! field schema, and submitted keys without a field binding, reject the
//! whole submission before any mutation happens.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::model::VariableSet;

/// Field types supported by form definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    Dropdown,
}

/// A single field binding in a form definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    /// Variable name the field binds to.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

/// A form definition resolved from the form repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefinition {
    pub id: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

/// A submitted form payload as received from the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSubmission {
    pub form_id: String,
    #[serde(default)]
    pub values: HashMap<String, serde_json::Value>,
    /// Outcome button pressed, if the form defines outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

/// Extract typed process variables from a submission against the form's
/// field bindings.
pub fn variables_from_submission(
    form: &FormDefinition,
    submission: &FormSubmission,
) -> AppResult<VariableSet> {
    // Reject keys that have no field binding
    for key in submission.values.keys() {
        if !form.fields.iter().any(|f| &f.id == key) {
            return Err(AppError::Validation(format!(
                "Submitted value '{}' is not a field of form '{}'",
                key, form.key
            )));
        }
    }

    let mut variables = VariableSet::new();

    for field in &form.fields {
        let value = submission.values.get(&field.id);

        let value = match value {
            None | Some(serde_json::Value::Null) => {
                if field.required {
                    return Err(AppError::Validation(format!(
                        "Required field '{}' is missing from the submission",
                        field.id
                    )));
                }
                continue;
            }
            Some(v) => v,
        };

        variables.insert(field.id.clone(), coerce_value(field, value)?);
    }

    if let Some(outcome) = &submission.outcome {
        variables.insert(
            "outcome".to_string(),
            serde_json::Value::String(outcome.clone()),
        );
    }

    Ok(variables)
}

/// Coerce a submitted value to the field's type.
fn coerce_value(field: &FormField, value: &serde_json::Value) -> AppResult<serde_json::Value> {
    let mismatch = || {
        AppError::Validation(format!(
            "Field '{}' expects {:?}, got {}",
            field.id, field.kind, value
        ))
    };

    match field.kind {
        FieldKind::Text | FieldKind::Dropdown => match value {
            serde_json::Value::String(_) => Ok(value.clone()),
            _ => Err(mismatch()),
        },
        FieldKind::Integer => match value {
            serde_json::Value::Number(n) if n.as_i64().is_some() => Ok(value.clone()),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| serde_json::Value::Number(i.into()))
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        FieldKind::Decimal => match value {
            serde_json::Value::Number(_) => Ok(value.clone()),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        FieldKind::Boolean => match value {
            serde_json::Value::Bool(_) => Ok(value.clone()),
            serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(serde_json::Value::Bool(true)),
                "false" => Ok(serde_json::Value::Bool(false)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        },
        FieldKind::Date => match value {
            serde_json::Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(|_| value.clone())
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
    }
}
