//! Export engines: the accumulate-then-finalize lifecycle shared by the
//! workbook and delimited variants.
//!
//! An engine stages sheets one at a time with
//! [`add_sheet`](ExportEngine::add_sheet); rows stream straight into the
//! output while a sheet is built. [`export`](ExportEngine::export) consumes
//! the engine and returns the finished artifact. After any error the engine
//! refuses further work and its partial output is dropped, never returned.

use crate::aggregate::{AggregationPolicy, SumNumericColumns};
use crate::csv_writer::DelimitedExport;
use crate::error::{ExportError, Result};
use crate::format::{FormatResolver, RenderMode};
use crate::options::ExportOptions;
use crate::plan::ColumnPlan;
use crate::sheet::{RowSink, Sheet, SheetBuilder, SheetSummary};
use crate::source::TableSource;
use crate::writer::WorkbookExport;
use std::io::Write;

/// MIME type of structured workbooks
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// MIME type of delimited text
pub const CSV_MIME_TYPE: &str = "text/csv";

const DEFAULT_FILE_STEM: &str = "Table-Export";
const MAX_SHEET_NAME: usize = 31;

/// Output container kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Workbook,
    Delimited,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Workbook => "xlsx",
            ExportFormat::Delimited => "csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Workbook => XLSX_MIME_TYPE,
            ExportFormat::Delimited => CSV_MIME_TYPE,
        }
    }

    pub(crate) fn render_mode(&self) -> RenderMode {
        match self {
            ExportFormat::Workbook => RenderMode::Native,
            ExportFormat::Delimited => RenderMode::Display,
        }
    }
}

/// The finished export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact<W = Vec<u8>> {
    /// The writer the container was streamed into
    pub output: W,
    /// Suggested file name, extension included
    pub file_name: String,
    pub mime_type: &'static str,
}

/// One export operation
pub trait ExportEngine: Sized {
    type Output;

    /// Build a sheet from `sheet` and append it to the output
    fn add_sheet<S: TableSource + ?Sized>(&mut self, sheet: Sheet<'_, S>) -> Result<SheetSummary>;

    /// Serialize everything staged and hand the artifact over
    fn export(self) -> Result<ExportArtifact<Self::Output>>;

    fn format(&self) -> ExportFormat;

    fn options(&self) -> &ExportOptions;

    /// Stage a source under the default name and title
    fn add_source<S: TableSource + ?Sized>(&mut self, source: &S) -> Result<SheetSummary> {
        self.add_sheet(Sheet::new(source))
    }

    /// File name the artifact will carry
    fn file_name(&self) -> String {
        resolve_file_name(self.options(), self.format())
    }
}

/// Pick the engine kind the options ask for.
///
/// Delimited output is chosen by `delimited_mode` or by an explicit `.csv`
/// file name; `delimited_mode` with a workbook file name is rejected.
pub fn resolve_format(options: &ExportOptions) -> Result<ExportFormat> {
    let extension = options
        .export_file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match (options.delimited_mode, extension.as_deref()) {
        (true, Some(ext @ ("xlsx" | "xls"))) => Err(ExportError::Configuration(format!(
            "delimited mode cannot produce a .{} file",
            ext
        ))),
        (true, _) | (false, Some("csv")) => Ok(ExportFormat::Delimited),
        _ => Ok(ExportFormat::Workbook),
    }
}

/// File name for an export: the explicit name (a spreadsheet extension is
/// replaced by the format's own, any other is kept and extended), else a name derived from the report title, the sheet name, or
/// `Table-Export`.
///
/// ```
/// use tablestream::export::{resolve_file_name, ExportFormat};
/// use tablestream::ExportOptions;
///
/// let options = ExportOptions::default().with_report_title("Demo Report: 2024");
/// assert_eq!(resolve_file_name(&options, ExportFormat::Workbook), "Demo-Report--2024.xlsx");
///
/// let options = options.with_export_file_name("payroll");
/// assert_eq!(resolve_file_name(&options, ExportFormat::Delimited), "payroll.csv");
///
/// let options = ExportOptions::default().with_export_file_name("Table-Export.xls");
/// assert_eq!(resolve_file_name(&options, ExportFormat::Workbook), "Table-Export.xlsx");
/// ```
pub fn resolve_file_name(options: &ExportOptions, format: ExportFormat) -> String {
    let extension = format.extension();
    if let Some(name) = options
        .export_file_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        return match name.rsplit_once('.') {
            Some((_, ext)) if ext.eq_ignore_ascii_case(extension) => name.to_string(),
            Some((stem, ext)) if is_spreadsheet_extension(ext) && !stem.is_empty() => {
                format!("{}.{}", stem, extension)
            }
            _ => format!("{}.{}", name, extension),
        };
    }

    let stem = [options.report_title.as_deref(), Some(options.sheet_name.as_str())]
        .into_iter()
        .flatten()
        .map(sanitize_file_stem)
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_STEM.to_string());
    format!("{}.{}", stem, extension)
}

fn is_spreadsheet_extension(ext: &str) -> bool {
    ["xlsx", "xls", "csv"].iter().any(|known| ext.eq_ignore_ascii_case(known))
}

fn sanitize_file_stem(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    // A stem made only of separators carries no name
    if cleaned.chars().all(|c| matches!(c, '-' | '.' | '_')) {
        String::new()
    } else {
        cleaned
    }
}

/// Make a name acceptable as a workbook sheet name
///
/// ```
/// use tablestream::export::sanitize_sheet_name;
///
/// assert_eq!(sanitize_sheet_name("Q1/Q2 [draft]", 1), "Q1_Q2 _draft_");
/// assert_eq!(sanitize_sheet_name("   ", 2), "Sheet2");
/// ```
pub fn sanitize_sheet_name(name: &str, index: usize) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.is_empty() {
        format!("Sheet{}", index)
    } else {
        cleaned
    }
}

/// State shared by both engines: options, resolver, policy, staged sheets
pub(crate) struct ExportSession {
    options: ExportOptions,
    format: ExportFormat,
    resolver: FormatResolver,
    policy: Box<dyn AggregationPolicy>,
    sheets: Vec<SheetSummary>,
    failed: bool,
}

impl ExportSession {
    pub(crate) fn new(options: ExportOptions, format: ExportFormat) -> Self {
        tracing::info!(
            format = ?format,
            file_name = %resolve_file_name(&options, format),
            "export started"
        );
        let resolver = FormatResolver::new(options.format_defaults.clone(), format.render_mode());
        ExportSession {
            options,
            format,
            resolver,
            policy: Box::new(SumNumericColumns),
            sheets: Vec::new(),
            failed: false,
        }
    }

    pub(crate) fn set_policy(&mut self, policy: Box<dyn AggregationPolicy>) {
        self.policy = policy;
    }

    pub(crate) fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub(crate) fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        if self.failed {
            Err(ExportError::Configuration(
                "export was aborted by an earlier error".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    /// Record a failure; the engine refuses all further work
    pub(crate) fn fail(&mut self, err: ExportError) -> ExportError {
        self.failed = true;
        tracing::debug!(%err, "export poisoned");
        err
    }

    /// Name the next sheet gets
    pub(crate) fn next_sheet_name(&self, requested: Option<&str>) -> String {
        let index = self.sheets.len() + 1;
        let raw = match requested {
            Some(name) => name.to_string(),
            None if index == 1 => self.options.sheet_name.clone(),
            None => format!("Sheet{}", index),
        };
        match self.format {
            ExportFormat::Workbook => sanitize_sheet_name(&raw, index),
            ExportFormat::Delimited => raw,
        }
    }

    /// Build one sheet into `sink`
    pub(crate) fn stage<S, K>(&mut self, sink: &mut K, sheet: Sheet<'_, S>) -> Result<SheetSummary>
    where
        S: TableSource + ?Sized,
        K: RowSink + ?Sized,
    {
        self.ensure_usable()?;

        let name = self.next_sheet_name(sheet.name.as_deref());
        let title = sheet.title.or_else(|| self.options.report_title.clone());
        let plan = match sheet.plan {
            Some(plan) => plan,
            None => ColumnPlan::build(sheet.source, &self.options),
        };

        let built = SheetBuilder::new(&self.options, &self.resolver)
            .with_policy(self.policy.as_ref())
            .build(&name, title.as_deref(), sheet.source, &plan, sink);

        match built {
            Ok(summary) => {
                self.sheets.push(summary.clone());
                Ok(summary)
            }
            Err(err) => {
                let err = err.while_writing(&format!("sheet '{}'", name));
                Err(self.fail(err))
            }
        }
    }

    /// Wrap the finished output, logging the outcome
    pub(crate) fn finish<W>(&mut self, output: Result<W>) -> Result<ExportArtifact<W>> {
        let output = output.map_err(|err| self.fail(err.while_writing("closing output")))?;
        let file_name = resolve_file_name(&self.options, self.format);
        tracing::info!(
            file_name = %file_name,
            sheets = self.sheets.len(),
            rows = self.sheets.iter().map(|s| s.data_rows).sum::<usize>(),
            "export finished"
        );
        Ok(ExportArtifact {
            output,
            file_name,
            mime_type: self.format.mime_type(),
        })
    }

    pub(crate) fn require_sheets(&self) -> Result<()> {
        if self.sheets.is_empty() {
            Err(ExportError::Configuration(
                "no sheet was added before export".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Either engine, picked from the options at runtime
///
/// # Examples
///
/// ```
/// use tablestream::{AnyExport, ColumnDef, ExportEngine, ExportOptions, MemoryTable, ValueType};
///
/// let table = MemoryTable::builder()
///     .column(ColumnDef::new("name", ValueType::Text))
///     .row(vec!["Jane".into()])
///     .build();
///
/// let mut engine = AnyExport::from_options(ExportOptions::default().with_export_file_name("people.csv"))?;
/// engine.add_source(&table)?;
/// let artifact = engine.export()?;
/// assert_eq!(artifact.mime_type, "text/csv");
/// assert_eq!(artifact.output, b"name\r\nJane\r\n");
/// # Ok::<(), tablestream::ExportError>(())
/// ```
pub enum AnyExport<W: Write = Vec<u8>> {
    Workbook(WorkbookExport<W>),
    Delimited(DelimitedExport<W>),
}

impl AnyExport<Vec<u8>> {
    /// Engine writing into memory
    pub fn from_options(options: ExportOptions) -> Result<Self> {
        Self::with_writer(Vec::new(), options)
    }
}

impl<W: Write> AnyExport<W> {
    /// Engine streaming into `writer`
    pub fn with_writer(writer: W, options: ExportOptions) -> Result<Self> {
        Ok(match resolve_format(&options)? {
            ExportFormat::Workbook => AnyExport::Workbook(WorkbookExport::with_writer(writer, options)),
            ExportFormat::Delimited => {
                AnyExport::Delimited(DelimitedExport::with_writer(writer, options))
            }
        })
    }

    /// Replace the totals policy
    pub fn with_policy<P: AggregationPolicy + 'static>(self, policy: P) -> Self {
        match self {
            AnyExport::Workbook(e) => AnyExport::Workbook(e.with_policy(policy)),
            AnyExport::Delimited(e) => AnyExport::Delimited(e.with_policy(policy)),
        }
    }
}

impl<W: Write> ExportEngine for AnyExport<W> {
    type Output = W;

    fn add_sheet<S: TableSource + ?Sized>(&mut self, sheet: Sheet<'_, S>) -> Result<SheetSummary> {
        match self {
            AnyExport::Workbook(e) => e.add_sheet(sheet),
            AnyExport::Delimited(e) => e.add_sheet(sheet),
        }
    }

    fn export(self) -> Result<ExportArtifact<W>> {
        match self {
            AnyExport::Workbook(e) => e.export(),
            AnyExport::Delimited(e) => e.export(),
        }
    }

    fn format(&self) -> ExportFormat {
        match self {
            AnyExport::Workbook(e) => e.format(),
            AnyExport::Delimited(e) => e.format(),
        }
    }

    fn options(&self) -> &ExportOptions {
        match self {
            AnyExport::Workbook(e) => e.options(),
            AnyExport::Delimited(e) => e.options(),
        }
    }
}
