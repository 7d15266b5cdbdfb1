//! Configuration loading and validation errors.

use std::path::PathBuf;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    #[error("configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut output = String::new();
    collect_validation_errors(errors, "", &mut output);
    output
}

/// Flattens nested section errors into `section.field` lines.
fn collect_validation_errors(errors: &ValidationErrors, prefix: &str, output: &mut String) {
    use std::fmt::Write;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errors) => {
                for error in errors {
                    let message = match &error.message {
                        Some(msg) => msg.to_string(),
                        None => error.code.to_string(),
                    };
                    let _ = writeln!(output, "  - {path}: {message}");
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_validation_errors(nested, &path, output)
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_errors(nested, &format!("{path}[{index}]"), output);
                }
            }
        }
    }
}
