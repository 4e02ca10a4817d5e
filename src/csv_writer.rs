//! Delimited-text export
//!
//! One sheet per export. Every cell is written as the text it would show in
//! a workbook: patterns are applied before the record is written, quoting is
//! left to the `csv` writer.

use crate::aggregate::AggregationPolicy;
use crate::error::{ExportError, Result};
use crate::export::{ExportArtifact, ExportEngine, ExportFormat, ExportSession};
use crate::options::{DelimitedOptions, ExportOptions, LineTerminator};
use crate::plan::ColumnPlan;
use crate::sheet::{RowKind, RowSink, Sheet, SheetSummary};
use crate::source::TableSource;
use crate::types::StyledCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Delimited (CSV) export
///
/// # Examples
///
/// ```
/// use tablestream::{ColumnDef, DelimitedExport, ExportEngine, ExportOptions, MemoryTable, ValueType};
///
/// let table = MemoryTable::builder()
///     .column(ColumnDef::new("name", ValueType::Text).header("Name"))
///     .column(ColumnDef::new("amount", ValueType::Float).header("Amount"))
///     .row(vec!["Doe, Jane".into(), 1000.0.into()])
///     .build();
///
/// let mut export = DelimitedExport::new(ExportOptions::default());
/// export.add_source(&table)?;
/// let artifact = export.export()?;
/// assert_eq!(
///     String::from_utf8(artifact.output).unwrap(),
///     "Name,Amount\r\n\"Doe, Jane\",1000.00\r\n"
/// );
/// # Ok::<(), tablestream::ExportError>(())
/// ```
pub struct DelimitedExport<W: Write = Vec<u8>> {
    session: ExportSession,
    sink: DelimitedSink<W>,
}

impl DelimitedExport<Vec<u8>> {
    /// Export into memory
    pub fn new(options: ExportOptions) -> Self {
        Self::with_writer(Vec::new(), options)
    }
}

impl DelimitedExport<BufWriter<File>> {
    /// Export straight to a file on disk
    pub fn create<P: AsRef<Path>>(path: P, options: ExportOptions) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_writer(BufWriter::new(file), options))
    }
}

impl<W: Write> DelimitedExport<W> {
    /// Export streaming into `output`
    pub fn with_writer(output: W, options: ExportOptions) -> Self {
        let sink = DelimitedSink::new(output, &options.delimited);
        DelimitedExport {
            session: ExportSession::new(options, ExportFormat::Delimited),
            sink,
        }
    }

    /// Replace the totals policy
    pub fn with_policy<P: AggregationPolicy + 'static>(mut self, policy: P) -> Self {
        self.session.set_policy(Box::new(policy));
        self
    }
}

impl<W: Write> ExportEngine for DelimitedExport<W> {
    type Output = W;

    fn add_sheet<S: TableSource + ?Sized>(&mut self, sheet: Sheet<'_, S>) -> Result<SheetSummary> {
        self.session.ensure_usable()?;
        if self.session.sheet_count() > 0 {
            return Err(self.session.fail(ExportError::Configuration(
                "delimited output holds a single sheet".to_string(),
            )));
        }
        self.session.stage(&mut self.sink, sheet)
    }

    fn export(mut self) -> Result<ExportArtifact<W>> {
        self.session.ensure_usable()?;
        self.session.require_sheets()?;
        let output = self.sink.writer.into_inner().map_err(ExportError::from);
        self.session.finish(output)
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Delimited
    }

    fn options(&self) -> &ExportOptions {
        self.session.options()
    }
}

struct DelimitedSink<W: Write> {
    writer: csv::Writer<W>,
    record: Vec<String>,
}

impl<W: Write> DelimitedSink<W> {
    fn new(output: W, options: &DelimitedOptions) -> Self {
        let terminator = match options.terminator {
            LineTerminator::CrLf => csv::Terminator::CRLF,
            LineTerminator::Lf => csv::Terminator::Any(b'\n'),
        };
        let writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .terminator(terminator)
            .quote_style(csv::QuoteStyle::Necessary)
            // an empty plan still gets a one-field title row
            .flexible(true)
            .from_writer(output);
        DelimitedSink {
            writer,
            record: Vec::new(),
        }
    }
}

impl<W: Write> RowSink for DelimitedSink<W> {
    fn begin_sheet(&mut self, _name: &str, _plan: &ColumnPlan) -> Result<()> {
        Ok(())
    }

    fn write_row(&mut self, _kind: RowKind, cells: &[StyledCell]) -> Result<()> {
        self.record.clear();
        self.record.extend(cells.iter().map(StyledCell::display));
        self.writer.write_record(&self.record)?;
        Ok(())
    }

    fn end_sheet(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
