//! Sheet construction: streams one table into one section of the output
//!
//! A [`SheetBuilder`] walks a [`TableSource`] item by item and pushes fully
//! resolved, styled rows into a [`RowSink`]. Both export engines implement
//! the sink, so row production is identical for workbook and delimited
//! output; only the cell representation differs (see
//! [`RenderMode`](crate::format::RenderMode)).

use crate::aggregate::{AggregationPolicy, SumNumericColumns, TotalsAccumulator};
use crate::error::{ExportError, Result};
use crate::format::FormatResolver;
use crate::options::ExportOptions;
use crate::plan::{Column, ColumnPlan};
use crate::source::TableSource;
use crate::types::{CellRole, CellStyle, CellValue, StyledCell, ValueType};

/// Kind of row handed to a [`RowSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Banner row; first cell holds the title, the rest are empty
    Title,
    Header,
    Data,
    Totals,
}

/// Receives the rows of a sheet in order
pub trait RowSink {
    /// Open a new sheet section
    fn begin_sheet(&mut self, name: &str, plan: &ColumnPlan) -> Result<()>;

    /// Append one row to the open sheet
    fn write_row(&mut self, kind: RowKind, cells: &[StyledCell]) -> Result<()>;

    /// Close the open sheet
    fn end_sheet(&mut self) -> Result<()>;
}

/// One table staged for export
///
/// Name and title are the only settings a sheet may override; everything
/// else comes from the export's [`ExportOptions`].
pub struct Sheet<'a, S: TableSource + ?Sized> {
    pub(crate) name: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) source: &'a S,
    pub(crate) plan: Option<ColumnPlan>,
}

impl<'a, S: TableSource + ?Sized> Sheet<'a, S> {
    /// Sheet named after the export options
    pub fn new(source: &'a S) -> Self {
        Sheet {
            name: None,
            title: None,
            source,
            plan: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Banner text; replaces the export's report title for this sheet
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Use a prepared plan instead of deriving one from the source
    pub fn with_plan(mut self, plan: ColumnPlan) -> Self {
        self.plan = Some(plan);
        self
    }
}

/// What one sheet build produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSummary {
    pub name: String,
    pub columns: usize,
    pub data_rows: usize,
    /// All rows including title, header and totals
    pub rows_written: usize,
    /// Cells whose pattern could not be applied
    pub format_fallbacks: usize,
}

/// Streams one table into a [`RowSink`]
pub struct SheetBuilder<'a> {
    options: &'a ExportOptions,
    resolver: &'a FormatResolver,
    policy: &'a dyn AggregationPolicy,
}

impl<'a> SheetBuilder<'a> {
    pub fn new(options: &'a ExportOptions, resolver: &'a FormatResolver) -> Self {
        SheetBuilder {
            options,
            resolver,
            policy: &SumNumericColumns,
        }
    }

    pub fn with_policy(mut self, policy: &'a dyn AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build one sheet: optional title, header, one row per item, optional
    /// totals.
    ///
    /// A source failure aborts the sheet with the offending sheet, column
    /// and item attached.
    pub fn build<S, K>(
        &self,
        name: &str,
        title: Option<&str>,
        source: &S,
        plan: &ColumnPlan,
        sink: &mut K,
    ) -> Result<SheetSummary>
    where
        S: TableSource + ?Sized,
        K: RowSink + ?Sized,
    {
        let span = tracing::info_span!("sheet", name = %name);
        let _enter = span.enter();

        let columns = plan.columns();
        let width = columns.len();
        let mut rows_written = 0;

        sink.begin_sheet(name, plan)?;

        if let Some(title) = title {
            let mut cells = Vec::with_capacity(width.max(1));
            cells.push(StyledCell::new(
                CellValue::Text(title.to_string()),
                CellStyle::new(CellRole::Title),
            ));
            cells.resize(
                width.max(1),
                StyledCell::new(CellValue::Empty, CellStyle::new(CellRole::Title)),
            );
            sink.write_row(RowKind::Title, &cells)?;
            rows_written += 1;
        }

        let header: Vec<StyledCell> = columns
            .iter()
            .map(|c| {
                StyledCell::new(
                    CellValue::Text(c.header.clone()),
                    CellStyle::new(CellRole::Header).with_alignment(c.alignment),
                )
            })
            .collect();
        sink.write_row(RowKind::Header, &header)?;
        rows_written += 1;

        let generators: Vec<_> = columns
            .iter()
            .map(|c| {
                if c.is_generated {
                    source.generated_columns().iter().find(|g| g.id() == c.id)
                } else {
                    None
                }
            })
            .collect();

        let mut totals = self
            .options
            .display_totals
            .then(|| TotalsAccumulator::new(plan, self.policy));
        let mut fallbacks = vec![0usize; width];
        let mut row = Vec::with_capacity(width);
        let mut data_rows = 0;

        for item in source.item_ids() {
            row.clear();
            for (index, column) in columns.iter().enumerate() {
                let raw = match generators[index] {
                    Some(generator) => generator.evaluate(&item, &column.id),
                    None => source.property_value(&item, &column.id),
                }
                .map_err(|err| ExportError::SourceAccess {
                    sheet: name.to_string(),
                    column: column.id.clone(),
                    item: format!("{:?}", item),
                    source: err,
                })?;

                if let Some(totals) = totals.as_mut() {
                    totals.push(index, &raw);
                }

                let formatted = self
                    .resolver
                    .try_resolve(&raw, column.value_type, column.format.as_deref())
                    .unwrap_or_else(|err| {
                        tracing::debug!(column = %column.id, %err, "format fallback");
                        fallbacks[index] += 1;
                        self.resolver.fallback(&raw)
                    });
                row.push(StyledCell::new(
                    formatted.value,
                    data_style(column, formatted.num_format),
                ));
            }
            sink.write_row(RowKind::Data, &row)?;
            data_rows += 1;
        }
        rows_written += data_rows;

        if let Some(totals) = totals {
            let values = totals.finish(&self.options.total_label);
            let cells: Vec<StyledCell> = columns
                .iter()
                .zip(values)
                .enumerate()
                .map(|(index, (column, value))| {
                    let formatted = if totals.is_aggregated(index) {
                        self.resolver.resolve(
                            &value,
                            column.value_type,
                            column.format.as_deref(),
                        )
                    } else {
                        self.resolver.resolve(&value, ValueType::Text, None)
                    };
                    let mut style = data_style(column, formatted.num_format);
                    style.role = CellRole::Totals;
                    StyledCell::new(formatted.value, style)
                })
                .collect();
            sink.write_row(RowKind::Totals, &cells)?;
            rows_written += 1;
        }

        sink.end_sheet()?;

        for (column, count) in columns.iter().zip(&fallbacks) {
            if *count > 0 {
                tracing::warn!(
                    sheet = %name,
                    column = %column.id,
                    cells = *count,
                    "format pattern did not apply; wrote natural text"
                );
            }
        }

        let summary = SheetSummary {
            name: name.to_string(),
            columns: width,
            data_rows,
            rows_written,
            format_fallbacks: fallbacks.iter().sum(),
        };
        tracing::debug!(
            columns = summary.columns,
            rows = summary.data_rows,
            "sheet written"
        );
        Ok(summary)
    }
}

fn data_style(column: &Column, num_format: Option<String>) -> CellStyle {
    let role = if column.is_row_header {
        CellRole::RowHeader
    } else {
        CellRole::Data
    };
    CellStyle {
        role,
        alignment: column.alignment,
        num_format,
        vertical: column.vertical,
    }
}
