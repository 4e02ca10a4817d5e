//! Value formatting: per-type default patterns, per-column overrides and the
//! natural-text fallback.
//!
//! A [`FormatResolver`] turns a raw [`CellValue`] into a [`FormattedCell`].
//! In [`RenderMode::Native`] the value keeps its type and carries the
//! pattern the workbook writer registers as a number format. In
//! [`RenderMode::Display`] the pattern is applied here and the cell becomes
//! text. A pattern that cannot be applied never aborts an export: the cell
//! degrades to the value's natural text.

pub mod date;
pub mod number;

pub use date::{excel_serial, is_date_pattern, DatePattern};
pub use number::NumberPattern;

use crate::error::FormatError;
use crate::options::FormatDefaults;
use crate::types::{CellValue, ValueType};

/// How resolved cells are represented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Typed value plus pattern (structured workbook)
    Native,
    /// Text with the pattern already applied (delimited text)
    Display,
}

/// A resolved cell: value plus the number/date pattern that applies to it
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedCell {
    pub value: CellValue,
    pub num_format: Option<String>,
}

impl FormattedCell {
    pub fn plain(value: CellValue) -> Self {
        FormattedCell {
            value,
            num_format: None,
        }
    }

    /// Text the cell shows
    pub fn display(&self) -> String {
        render(&self.value, self.num_format.as_deref())
    }
}

/// Resolves values against per-type defaults and per-column overrides.
///
/// Created per export operation; holds no shared state.
#[derive(Debug, Clone)]
pub struct FormatResolver {
    defaults: FormatDefaults,
    mode: RenderMode,
}

impl FormatResolver {
    pub fn new(defaults: FormatDefaults, mode: RenderMode) -> Self {
        FormatResolver { defaults, mode }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Pattern that governs a column: the override wins, else the default
    /// for its declared type
    pub fn pattern_for<'a>(
        &'a self,
        value_type: ValueType,
        column_override: Option<&'a str>,
    ) -> Option<&'a str> {
        column_override.or(match value_type {
            ValueType::Date => Some(self.defaults.date.as_str()),
            ValueType::Float => Some(self.defaults.numeric.as_str()),
            ValueType::Integer => Some(self.defaults.integer.as_str()),
            ValueType::Text | ValueType::Boolean => None,
        })
    }

    /// Resolve one value. Never fails; an inapplicable pattern yields the
    /// natural text representation.
    pub fn resolve(
        &self,
        value: &CellValue,
        value_type: ValueType,
        column_override: Option<&str>,
    ) -> FormattedCell {
        self.try_resolve(value, value_type, column_override)
            .unwrap_or_else(|err| {
                tracing::debug!(%err, "format pattern fell back to natural text");
                self.fallback(value)
            })
    }

    /// Resolve one value, reporting a pattern that cannot be applied
    pub fn try_resolve(
        &self,
        value: &CellValue,
        value_type: ValueType,
        column_override: Option<&str>,
    ) -> Result<FormattedCell, FormatError> {
        if value.is_empty() {
            return Ok(FormattedCell::plain(CellValue::Empty));
        }
        let pattern = self
            .pattern_for(value_type, column_override)
            .filter(|p| !is_general(p));

        let Some(pattern) = pattern else {
            return Ok(match self.mode {
                RenderMode::Native => FormattedCell::plain(value.clone()),
                RenderMode::Display => FormattedCell::plain(CellValue::Text(value.as_string())),
            });
        };

        match self.mode {
            RenderMode::Native => check(value, pattern).map(|()| FormattedCell {
                value: value.clone(),
                num_format: Some(pattern.to_string()),
            }),
            RenderMode::Display => {
                apply(value, pattern).map(|text| FormattedCell::plain(CellValue::Text(text)))
            }
        }
    }

    /// Natural representation used when a pattern does not apply
    pub fn fallback(&self, value: &CellValue) -> FormattedCell {
        natural(value, self.mode)
    }
}

fn natural(value: &CellValue, mode: RenderMode) -> FormattedCell {
    match (mode, value) {
        // A date without a date format would show as a bare serial number.
        (RenderMode::Native, CellValue::DateTime(_)) | (RenderMode::Display, _) => {
            FormattedCell::plain(CellValue::Text(value.as_string()))
        }
        (RenderMode::Native, _) => FormattedCell::plain(value.clone()),
    }
}

fn is_general(pattern: &str) -> bool {
    pattern.is_empty() || pattern == "@" || pattern.eq_ignore_ascii_case("general")
}

/// Apply a pattern to a value
pub fn apply(value: &CellValue, pattern: &str) -> Result<String, FormatError> {
    if is_general(pattern) {
        return Ok(value.as_string());
    }
    match value {
        CellValue::Empty => Ok(String::new()),
        CellValue::Int(_) | CellValue::Float(_) if !is_date_pattern(pattern) => {
            let n = value.as_f64().unwrap_or_default();
            NumberPattern::parse(pattern)?.format(n)
        }
        CellValue::DateTime(dt) if is_date_pattern(pattern) => DatePattern::parse(pattern)?.format(dt),
        other => Err(mismatch(pattern, other)),
    }
}

/// Check that a pattern applies to a value without rendering it
pub fn check(value: &CellValue, pattern: &str) -> Result<(), FormatError> {
    match value {
        CellValue::Empty => Ok(()),
        CellValue::Int(_) => NumberPattern::parse(pattern).map(|_| ()),
        CellValue::Float(f) if f.is_finite() => NumberPattern::parse(pattern).map(|_| ()),
        CellValue::DateTime(_) if is_date_pattern(pattern) => DatePattern::parse(pattern).map(|_| ()),
        other => Err(mismatch(pattern, other)),
    }
}

/// Render a value with an optional pattern, falling back to natural text
pub fn render(value: &CellValue, pattern: Option<&str>) -> String {
    match pattern {
        None => value.as_string(),
        Some(p) => apply(value, p).unwrap_or_else(|_| value.as_string()),
    }
}

fn mismatch(pattern: &str, value: &CellValue) -> FormatError {
    let kind = match value {
        CellValue::Empty => "empty",
        CellValue::Text(_) => "text",
        CellValue::Int(_) => "integer",
        CellValue::Float(_) => "float",
        CellValue::Bool(_) => "boolean",
        CellValue::DateTime(_) => "date",
    };
    FormatError::Mismatch {
        pattern: pattern.to_string(),
        kind,
    }
}
