//! Validation reports returned by entities.

use serde::{Deserialize, Serialize};
use validator::{ValidationErrors, ValidationErrorsKind};

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Dotted path of the offending field, e.g. `rating.rate`.
    pub field: String,
    /// Machine-readable rule code, e.g. `length` or `url`.
    pub error: String,
    /// Human-readable explanation.
    pub detail: String,
}

/// Outcome of validating an entity. Validation never raises; callers inspect
/// `is_valid` and decide whether to proceed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResultDetail {
    pub is_valid: bool,
    pub errors: Vec<ValidationErrorDetail>,
}

impl ValidationResultDetail {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }
}

impl From<Result<(), ValidationErrors>> for ValidationResultDetail {
    fn from(result: Result<(), ValidationErrors>) -> Self {
        match result {
            Ok(()) => Self::valid(),
            Err(errors) => {
                let mut details = Vec::new();
                flatten(&errors, "", &mut details);
                details.sort_by(|a, b| a.field.cmp(&b.field).then(a.error.cmp(&b.error)));
                Self {
                    is_valid: details.is_empty(),
                    errors: details,
                }
            }
        }
    }
}

fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut Vec<ValidationErrorDetail>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(field_errors.iter().map(|e| ValidationErrorDetail {
                    field: path.clone(),
                    error: e.code.to_string(),
                    detail: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{path} failed `{}` validation", e.code)),
                }));
            }
            ValidationErrorsKind::Struct(nested) => flatten(nested, &path, out),
            ValidationErrorsKind::List(entries) => {
                for (index, nested) in entries {
                    flatten(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
