//! Export configuration

use crate::fast_writer::StreamingProfile;
use crate::types::SheetFonts;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Export-wide default patterns, one per value kind that has one
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormatDefaults {
    /// Floating-point columns
    pub numeric: String,
    /// Integral columns
    pub integer: String,
    /// Date/time columns
    pub date: String,
}

impl Default for FormatDefaults {
    fn default() -> Self {
        FormatDefaults {
            numeric: "#0.00".to_string(),
            integer: "0".to_string(),
            date: "mm/dd/yyyy".to_string(),
        }
    }
}

/// Record terminator for delimited output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LineTerminator {
    #[default]
    CrLf,
    Lf,
}

/// Delimited-text settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DelimitedOptions {
    pub delimiter: u8,
    pub quote: u8,
    pub terminator: LineTerminator,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        DelimitedOptions {
            delimiter: b',',
            quote: b'"',
            terminator: LineTerminator::CrLf,
        }
    }
}

/// Options for one export operation.
///
/// Fixed once the first sheet is built; sheets may only override their own
/// name and title (see [`Sheet`](crate::sheet::Sheet)).
///
/// # Examples
///
/// ```
/// use tablestream::ExportOptions;
///
/// let options = ExportOptions::default()
///     .with_report_title("Demo Report")
///     .with_sheet_name("Table Export")
///     .with_display_totals(true)
///     .with_row_headers(true)
///     .with_column_format("date", "yyyy-mm-dd");
/// assert_eq!(options.sheet_name, "Table Export");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExportOptions {
    /// Explicit file name; overrides the derived one
    pub export_file_name: Option<String>,
    /// Banner row text on each sheet
    pub report_title: Option<String>,
    /// Name of the first sheet
    pub sheet_name: String,
    /// First plan column styled as a header and excluded from totals
    pub use_row_headers: bool,
    pub display_totals: bool,
    /// Label placed in the row-header cell of the totals row
    pub total_label: String,
    pub exclude_collapsed_columns: bool,
    /// Collapsed columns kept even when collapsed columns are excluded
    pub reincluded_columns: Vec<String>,
    /// Replaces the source's visible column order
    pub column_order: Option<Vec<String>>,
    /// Prefer source-declared column formats over the export-wide defaults
    pub use_source_format_override: bool,
    /// Per-column patterns; win over every other pattern
    pub column_formats: BTreeMap<String, String>,
    pub format_defaults: FormatDefaults,
    /// Write delimited text instead of a workbook
    pub delimited_mode: bool,
    pub delimited: DelimitedOptions,
    pub fonts: SheetFonts,
    pub streaming: StreamingProfile,
    /// Deflate level 0-9 for the workbook container
    pub compression_level: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            export_file_name: None,
            report_title: None,
            sheet_name: "Table Export".to_string(),
            use_row_headers: false,
            display_totals: false,
            total_label: "Total".to_string(),
            exclude_collapsed_columns: false,
            reincluded_columns: Vec::new(),
            column_order: None,
            use_source_format_override: false,
            column_formats: BTreeMap::new(),
            format_defaults: FormatDefaults::default(),
            delimited_mode: false,
            delimited: DelimitedOptions::default(),
            fonts: SheetFonts::default(),
            streaming: StreamingProfile::High,
            compression_level: 6,
        }
    }
}

impl ExportOptions {
    pub fn with_export_file_name(mut self, name: impl Into<String>) -> Self {
        self.export_file_name = Some(name.into());
        self
    }

    pub fn with_report_title(mut self, title: impl Into<String>) -> Self {
        self.report_title = Some(title.into());
        self
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    pub fn with_row_headers(mut self, enabled: bool) -> Self {
        self.use_row_headers = enabled;
        self
    }

    pub fn with_display_totals(mut self, enabled: bool) -> Self {
        self.display_totals = enabled;
        self
    }

    pub fn with_total_label(mut self, label: impl Into<String>) -> Self {
        self.total_label = label.into();
        self
    }

    pub fn with_exclude_collapsed_columns(mut self, enabled: bool) -> Self {
        self.exclude_collapsed_columns = enabled;
        self
    }

    /// Keep a collapsed column even when collapsed columns are excluded
    pub fn reinclude_column(mut self, column_id: impl Into<String>) -> Self {
        self.reincluded_columns.push(column_id.into());
        self
    }

    pub fn with_column_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_source_format_override(mut self, enabled: bool) -> Self {
        self.use_source_format_override = enabled;
        self
    }

    /// Pattern for one column, e.g. `("date", "mm/dd/yyyy")`
    pub fn with_column_format(mut self, column_id: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.column_formats.insert(column_id.into(), pattern.into());
        self
    }

    /// Default pattern for floating-point columns
    pub fn with_numeric_format(mut self, pattern: impl Into<String>) -> Self {
        self.format_defaults.numeric = pattern.into();
        self
    }

    /// Default pattern for integral columns
    pub fn with_integer_format(mut self, pattern: impl Into<String>) -> Self {
        self.format_defaults.integer = pattern.into();
        self
    }

    /// Default pattern for date columns
    pub fn with_date_format(mut self, pattern: impl Into<String>) -> Self {
        self.format_defaults.date = pattern.into();
        self
    }

    pub fn with_delimited_mode(mut self, enabled: bool) -> Self {
        self.delimited_mode = enabled;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimited.delimiter = delimiter;
        self
    }

    pub fn with_line_terminator(mut self, terminator: LineTerminator) -> Self {
        self.delimited.terminator = terminator;
        self
    }

    pub fn with_fonts(mut self, fonts: SheetFonts) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_streaming_profile(mut self, profile: StreamingProfile) -> Self {
        self.streaming = profile;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Whether a collapsed column survives planning
    pub(crate) fn is_reincluded(&self, column_id: &str) -> bool {
        self.reincluded_columns.iter().any(|c| c == column_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExportOptions::default();
        assert_eq!(options.format_defaults.numeric, "#0.00");
        assert_eq!(options.format_defaults.date, "mm/dd/yyyy");
        assert_eq!(options.total_label, "Total");
        assert!(!options.delimited_mode);
        assert_eq!(options.delimited.delimiter, b',');
    }

    #[test]
    fn test_builder_chain() {
        let options = ExportOptions::default()
            .with_column_format("date", "yyyy")
            .with_column_order(["b", "a"])
            .reinclude_column("garbage")
            .with_compression_level(42);
        assert_eq!(options.column_formats.get("date").map(String::as_str), Some("yyyy"));
        assert_eq!(options.column_order, Some(vec!["b".to_string(), "a".to_string()]));
        assert!(options.is_reincluded("garbage"));
        assert_eq!(options.compression_level, 9);
    }
}
