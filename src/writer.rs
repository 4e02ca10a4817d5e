//! Workbook export with streaming output
//!
//! Rows go straight into the compressed worksheet as each sheet is built;
//! memory stays bounded by the [`StreamingProfile`](crate::fast_writer::StreamingProfile)
//! window, not by the table size.

use crate::aggregate::AggregationPolicy;
use crate::error::Result;
use crate::export::{ExportArtifact, ExportEngine, ExportFormat, ExportSession};
use crate::fast_writer::FastWorkbook;
use crate::options::ExportOptions;
use crate::plan::ColumnPlan;
use crate::sheet::{RowKind, RowSink, Sheet, SheetSummary};
use crate::source::TableSource;
use crate::types::StyledCell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Structured workbook (XLSX) export
///
/// Each added sheet becomes one worksheet with typed cells, number formats,
/// header styling and an optional merged title row.
///
/// # Examples
///
/// ```
/// use tablestream::{ColumnDef, ExportEngine, ExportOptions, MemoryTable, Sheet, ValueType, WorkbookExport};
///
/// let table = MemoryTable::builder()
///     .column(ColumnDef::new("name", ValueType::Text).header("Name"))
///     .column(ColumnDef::new("amount", ValueType::Float).header("Amount"))
///     .row(vec!["Jane".into(), 1000.0.into()])
///     .row(vec!["John".into(), 750.0.into()])
///     .build();
///
/// let mut export = WorkbookExport::new(ExportOptions::default().with_display_totals(true));
/// let summary = export.add_sheet(Sheet::new(&table).named("Payroll"))?;
/// assert_eq!(summary.data_rows, 2);
///
/// let artifact = export.export()?;
/// assert_eq!(artifact.file_name, "Table-Export.xlsx");
/// assert!(artifact.output.starts_with(b"PK"));
/// # Ok::<(), tablestream::ExportError>(())
/// ```
pub struct WorkbookExport<W: Write = Vec<u8>> {
    session: ExportSession,
    workbook: FastWorkbook<W>,
}

impl WorkbookExport<Vec<u8>> {
    /// Export into memory
    pub fn new(options: ExportOptions) -> Self {
        Self::with_writer(Vec::new(), options)
    }
}

impl WorkbookExport<BufWriter<File>> {
    /// Export straight to a file on disk
    ///
    /// ```no_run
    /// use tablestream::{ExportOptions, WorkbookExport};
    ///
    /// let export = WorkbookExport::create("report.xlsx", ExportOptions::default())?;
    /// # Ok::<(), tablestream::ExportError>(())
    /// ```
    pub fn create<P: AsRef<Path>>(path: P, options: ExportOptions) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_writer(BufWriter::new(file), options))
    }
}

impl<W: Write> WorkbookExport<W> {
    /// Export streaming into `output`
    pub fn with_writer(output: W, options: ExportOptions) -> Self {
        let workbook = FastWorkbook::new(output, options.compression_level)
            .with_fonts(options.fonts.clone())
            .with_profile(options.streaming);
        WorkbookExport {
            session: ExportSession::new(options, ExportFormat::Workbook),
            workbook,
        }
    }

    /// Replace the totals policy
    pub fn with_policy<P: AggregationPolicy + 'static>(mut self, policy: P) -> Self {
        self.session.set_policy(Box::new(policy));
        self
    }

    /// Plan the columns `source` would export with these options
    pub fn plan<S: TableSource + ?Sized>(&self, source: &S) -> ColumnPlan {
        ColumnPlan::build(source, self.session.options())
    }

    /// Sheets added so far
    pub fn sheet_count(&self) -> usize {
        self.session.sheet_count()
    }

    /// Compressed bytes emitted so far
    pub fn bytes_written(&self) -> u64 {
        self.workbook.bytes_written()
    }
}

impl<W: Write> ExportEngine for WorkbookExport<W> {
    type Output = W;

    fn add_sheet<S: TableSource + ?Sized>(&mut self, sheet: Sheet<'_, S>) -> Result<SheetSummary> {
        self.session.stage(&mut WorkbookSink(&mut self.workbook), sheet)
    }

    fn export(mut self) -> Result<ExportArtifact<W>> {
        self.session.ensure_usable()?;
        self.session.require_sheets()?;
        let output = self.workbook.close();
        self.session.finish(output)
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Workbook
    }

    fn options(&self) -> &ExportOptions {
        self.session.options()
    }
}

/// Adapts the workbook container to the sheet builder
struct WorkbookSink<'a, W: Write>(&'a mut FastWorkbook<W>);

impl<W: Write> RowSink for WorkbookSink<'_, W> {
    fn begin_sheet(&mut self, name: &str, _plan: &ColumnPlan) -> Result<()> {
        self.0.add_worksheet(name)
    }

    fn write_row(&mut self, kind: RowKind, cells: &[StyledCell]) -> Result<()> {
        self.0.write_row(cells)?;
        if kind == RowKind::Title {
            self.0.merge_last_row(1, cells.len() as u32);
        }
        Ok(())
    }

    fn end_sheet(&mut self) -> Result<()> {
        self.0.finish_current_worksheet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExportError, SourceError};
    use crate::memory_table::{ColumnDef, MemoryTable};
    use crate::types::{CellValue, ValueType};
    use std::io::{Cursor, Read};

    fn payroll() -> MemoryTable {
        MemoryTable::builder()
            .column(ColumnDef::new("name", ValueType::Text).header("Name"))
            .column(ColumnDef::new("amount", ValueType::Float).header("Amount"))
            .row(vec!["Jane".into(), 1000.0.into()])
            .row(vec!["John".into(), 750.0.into()])
            .build()
    }

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_title_row_is_merged() {
        let options = ExportOptions::default().with_report_title("Demo Report");
        let mut export = WorkbookExport::new(options);
        export.add_source(&payroll()).unwrap();
        let artifact = export.export().unwrap();

        let sheet = part(&artifact.output, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("Demo Report"));
        assert!(sheet.contains("<mergeCell ref=\"A1:B1\"/>"));
        assert_eq!(sheet.matches("<row ").count(), 4);
        assert_eq!(artifact.file_name, "Demo-Report.xlsx");
    }

    #[test]
    fn test_sheet_names_follow_options() {
        let table = payroll();
        let mut export = WorkbookExport::new(ExportOptions::default().with_sheet_name("First"));
        export.add_source(&table).unwrap();
        export.add_source(&table).unwrap();
        export.add_sheet(Sheet::new(&table).named("Q1/Q2")).unwrap();
        let artifact = export.export().unwrap();

        let workbook = part(&artifact.output, "xl/workbook.xml");
        let first = workbook.find("name=\"First\"").unwrap();
        let second = workbook.find("name=\"Sheet2\"").unwrap();
        let third = workbook.find("name=\"Q1_Q2\"").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_totals_use_number_format() {
        let mut export = WorkbookExport::new(ExportOptions::default().with_display_totals(true));
        export.add_source(&payroll()).unwrap();
        let artifact = export.export().unwrap();

        let sheet = part(&artifact.output, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("<v>1750</v>"));
        let styles = part(&artifact.output, "xl/styles.xml");
        assert!(styles.contains("formatCode=\"#0.00\""));
    }

    #[test]
    fn test_malformed_column_format_is_not_registered() {
        let options = ExportOptions::default()
            .with_display_totals(true)
            .with_column_format("amount", "0.00\"abc");
        let mut export = WorkbookExport::new(options);
        let summary = export.add_source(&payroll()).unwrap();
        assert_eq!(summary.format_fallbacks, 2);
        let artifact = export.export().unwrap();

        let styles = part(&artifact.output, "xl/styles.xml");
        assert!(!styles.contains("abc"));
        assert!(!styles.contains("numFmtId=\"164\""));
        let sheet = part(&artifact.output, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("<v>1000</v>"));
        assert!(sheet.contains("<v>1750</v>"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_failure_is_serialization_error() {
        let options = ExportOptions::default().with_sheet_name("Payroll");
        let mut export = WorkbookExport::with_writer(ClosedPipe, options);
        match export.add_source(&payroll()) {
            Err(ExportError::Serialization(msg)) => {
                assert!(msg.contains("Payroll"));
                assert!(msg.contains("pipe closed"));
            }
            other => panic!("unexpected result: {:?}", other.map(|s| s.data_rows)),
        }
        assert!(matches!(export.export(), Err(ExportError::Configuration(_))));
    }

    #[test]
    fn test_export_without_sheets_fails() {
        let export = WorkbookExport::new(ExportOptions::default());
        assert!(matches!(export.export(), Err(ExportError::Configuration(_))));
    }

    struct Broken;

    impl TableSource for Broken {
        type ItemId = usize;

        fn item_ids(&self) -> Box<dyn Iterator<Item = usize> + '_> {
            Box::new(0..3)
        }

        fn visible_columns(&self) -> Vec<String> {
            vec!["name".to_string()]
        }

        fn property_type(&self, _column_id: &str) -> Option<ValueType> {
            Some(ValueType::Text)
        }

        fn property_value(&self, item: &usize, _column_id: &str) -> std::result::Result<CellValue, SourceError> {
            if *item == 1 {
                Err(SourceError::new("lookup failed"))
            } else {
                Ok("ok".into())
            }
        }
    }

    #[test]
    fn test_failed_sheet_poisons_export() {
        let mut export = WorkbookExport::new(ExportOptions::default());
        let err = export.add_source(&Broken).unwrap_err();
        assert!(matches!(
            err,
            ExportError::SourceAccess { ref column, ref item, .. } if column == "name" && item == "1"
        ));

        assert!(matches!(
            export.add_source(&payroll()),
            Err(ExportError::Configuration(_))
        ));
        assert!(export.export().is_err());
    }

    #[test]
    fn test_typed_cells_survive() {
        let table = MemoryTable::builder()
            .column(ColumnDef::new("count", ValueType::Integer))
            .row(vec![CellValue::Int(7)])
            .build();
        let mut export = WorkbookExport::new(ExportOptions::default());
        export.add_source(&table).unwrap();
        let artifact = export.export().unwrap();
        let sheet = part(&artifact.output, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("<v>7</v>"));
    }
}
