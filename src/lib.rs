//! # tablestream
//!
//! Streaming export of table-like data sources to XLSX workbooks and CSV.
//!
//! ## Features
//!
//! - **Column plans**: visible-column order, collapsed-column filtering with
//!   re-inclusion, generated (computed) columns and row headers
//! - **Formats**: per-column number/date patterns over export-wide defaults
//! - **Totals**: an optional summary row summing numeric columns, pluggable
//!   through [`AggregationPolicy`](aggregate::AggregationPolicy)
//! - **Two containers**: typed, styled workbooks or delimited text, produced
//!   by the same sheet builder
//! - **Streaming**: rows are compressed as they are produced; memory is
//!   bounded by the [`StreamingProfile`](fast_writer::StreamingProfile) window
//!
//! ## Quick Start
//!
//! ```rust
//! use tablestream::{
//!     Alignment, CellValue, ColumnDef, ExportEngine, ExportOptions, MemoryTable, Sheet, ValueType,
//!     WorkbookExport,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = MemoryTable::builder()
//!     .column(ColumnDef::new("name", ValueType::Text).header("Name"))
//!     .column(ColumnDef::new("amount", ValueType::Float).header("Amount").align(Alignment::End))
//!     .generated(
//!         ColumnDef::new("taxes", ValueType::Float).header("Taxes"),
//!         |record| match record.get("amount") {
//!             CellValue::Float(amount) => CellValue::Float(amount * 0.0825),
//!             _ => CellValue::Empty,
//!         },
//!     )
//!     .row(vec!["Jane".into(), 1000.0.into()])
//!     .row(vec!["John".into(), 750.0.into()])
//!     .build();
//!
//! let options = ExportOptions::default()
//!     .with_report_title("Demo Report")
//!     .with_row_headers(true)
//!     .with_display_totals(true)
//!     .with_column_format("taxes", "#0.0000");
//!
//! let mut export = WorkbookExport::new(options);
//! export.add_sheet(Sheet::new(&table).named("Payroll"))?;
//! let artifact = export.export()?;
//!
//! assert_eq!(artifact.file_name, "Demo-Report.xlsx");
//! # Ok(())
//! # }
//! ```
//!
//! Any type implementing [`TableSource`] can be exported;
//! [`MemoryTable`] is the in-memory implementation.

pub mod aggregate;
pub mod csv_writer;
pub mod error;
pub mod export;
pub mod fast_writer;
pub mod format;
pub mod memory_table;
pub mod options;
pub mod plan;
pub mod sheet;
pub mod source;
pub mod types;
pub mod writer;

pub use aggregate::{Aggregation, AggregationPolicy, SumNumericColumns};
pub use csv_writer::DelimitedExport;
pub use error::{ExportError, FormatError, Result, SourceError};
pub use export::{AnyExport, ExportArtifact, ExportEngine, ExportFormat};
pub use fast_writer::StreamingProfile;
pub use format::{FormatResolver, FormattedCell, RenderMode};
pub use memory_table::{ColumnDef, MemoryTable, Record};
pub use options::{DelimitedOptions, ExportOptions, FormatDefaults, LineTerminator};
pub use plan::{Column, ColumnPlan};
pub use sheet::{RowKind, RowSink, Sheet, SheetBuilder, SheetSummary};
pub use source::{GeneratedColumn, TableSource};
pub use types::{Alignment, CellRole, CellStyle, CellValue, FontSpec, SheetFonts, StyledCell, ValueType};
pub use writer::WorkbookExport;
