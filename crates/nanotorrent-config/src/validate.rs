//! Lenient field parsing for settings documents.
//!
//! Missing keys fall back to defaults and mark the document for write-back.
//! Invalid values fall back to defaults with a warning.

use toml::{Table, Value};
use tracing::warn;

use crate::error::ConfigError;

pub(crate) struct FieldReader<'a> {
    table: &'a Table,
    missing: bool,
}

impl<'a> FieldReader<'a> {
    pub(crate) const fn new(table: &'a Table) -> Self {
        Self {
            table,
            missing: false,
        }
    }

    /// Whether any section or key had to be filled in.
    pub(crate) const fn filled_missing(&self) -> bool {
        self.missing
    }

    fn value(&mut self, section: &'static str, field: &'static str) -> Option<&'a Value> {
        let found = self
            .table
            .get(section)
            .and_then(Value::as_table)
            .and_then(|values| values.get(field));
        if found.is_none() {
            self.missing = true;
        }
        found
    }

    pub(crate) fn string(
        &mut self,
        section: &'static str,
        field: &'static str,
        default: &str,
    ) -> String {
        match self.value(section, field) {
            None => default.to_string(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => {
                report(&ConfigError::InvalidField {
                    section,
                    field,
                    value: Some(other.to_string()),
                    reason: "must be a string",
                });
                default.to_string()
            }
        }
    }

    /// Rate limit in bytes per second; integers and numeric strings are
    /// accepted, anything else (including negatives) becomes 0.
    pub(crate) fn speed(&mut self, section: &'static str, field: &'static str) -> u64 {
        match self.value(section, field) {
            None => 0,
            Some(value) => match parse_speed(value) {
                Ok(speed) => speed,
                Err(reason) => {
                    report(&ConfigError::InvalidField {
                        section,
                        field,
                        value: Some(value.to_string()),
                        reason,
                    });
                    0
                }
            },
        }
    }

    pub(crate) fn port(&mut self, section: &'static str, field: &'static str, default: u16) -> u16 {
        let Some(value) = self.value(section, field) else {
            return default;
        };
        match value.as_integer().map(u16::try_from) {
            Some(Ok(port)) if port > 0 => port,
            _ => {
                report(&ConfigError::InvalidField {
                    section,
                    field,
                    value: Some(value.to_string()),
                    reason: "must be between 1 and 65535",
                });
                default
            }
        }
    }

    pub(crate) fn positive(
        &mut self,
        section: &'static str,
        field: &'static str,
        default: u64,
    ) -> u64 {
        let Some(value) = self.value(section, field) else {
            return default;
        };
        match value.as_integer().map(u64::try_from) {
            Some(Ok(number)) if number > 0 => number,
            _ => {
                report(&ConfigError::InvalidField {
                    section,
                    field,
                    value: Some(value.to_string()),
                    reason: "must be a positive integer",
                });
                default
            }
        }
    }
}

pub(crate) fn parse_speed(value: &Value) -> Result<u64, &'static str> {
    let number = match value {
        Value::Integer(number) => *number,
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| "must be a whole number")?,
        _ => return Err("must be an integer or numeric string"),
    };
    u64::try_from(number).map_err(|_| "must not be negative")
}

pub(crate) fn report(err: &ConfigError) {
    if let ConfigError::InvalidField {
        section,
        field,
        value,
        reason,
    } = err
    {
        warn!(
            section,
            field,
            value = value.as_deref().unwrap_or_default(),
            reason,
            "invalid setting replaced with default"
        );
    }
}
