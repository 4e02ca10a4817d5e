//! Column planning: which columns an export includes, in what order, and how
//! each one is decorated and formatted.

use crate::options::ExportOptions;
use crate::source::TableSource;
use crate::types::{Alignment, ValueType};
use std::collections::HashSet;

/// One planned column. Immutable once the plan is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub id: String,
    pub header: String,
    pub alignment: Alignment,
    /// Declared type; for generated columns, the generator's type
    pub value_type: ValueType,
    /// Column-level pattern (per-column option, or the source's own when
    /// source formats are preferred). `None` falls back to the type default.
    pub format: Option<String>,
    pub is_generated: bool,
    pub is_row_header: bool,
    /// Rotated text hint; decoration only
    pub vertical: bool,
}

impl Column {
    /// Whether the totals row aggregates this column
    pub fn is_numeric(&self) -> bool {
        self.value_type.is_numeric()
    }
}

/// Ordered, de-duplicated list of columns for one sheet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnPlan {
    columns: Vec<Column>,
}

impl ColumnPlan {
    /// Derive the plan from a source snapshot.
    ///
    /// Order comes from `options.column_order` when set, else from the
    /// source's visible columns. Generated columns missing from that order
    /// are appended. Collapsed columns are dropped when
    /// `exclude_collapsed_columns` is set unless re-included. The first
    /// remaining column becomes the row header when row headers are on.
    pub fn build<S: TableSource + ?Sized>(source: &S, options: &ExportOptions) -> Self {
        let generated = source.generated_columns();
        let mut order = options
            .column_order
            .clone()
            .unwrap_or_else(|| source.visible_columns());
        for column in generated {
            if !order.iter().any(|id| id == column.id()) {
                order.push(column.id().to_string());
            }
        }

        let mut seen = HashSet::new();
        let mut columns: Vec<Column> = order
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .filter(|id| {
                !(options.exclude_collapsed_columns
                    && source.is_collapsed(id)
                    && !options.is_reincluded(id))
            })
            .map(|id| {
                let generator = generated.iter().find(|g| g.id() == id);
                let value_type = match generator {
                    Some(g) => g.value_type(),
                    None => source.property_type(&id).unwrap_or(ValueType::Text),
                };
                let format = options.column_formats.get(&id).cloned().or_else(|| {
                    if options.use_source_format_override {
                        source.column_format(&id)
                    } else {
                        None
                    }
                });
                Column {
                    header: source.column_header(&id).unwrap_or_else(|| id.clone()),
                    alignment: source.column_alignment(&id),
                    vertical: source.is_vertical_text(&id),
                    value_type,
                    format,
                    is_generated: generator.is_some(),
                    is_row_header: false,
                    id,
                }
            })
            .collect();

        if options.use_row_headers {
            if let Some(first) = columns.first_mut() {
                first.is_row_header = true;
            }
        }

        ColumnPlan { columns }
    }

    /// Plan from already-resolved columns
    pub fn from_columns(columns: Vec<Column>) -> Self {
        ColumnPlan { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }
}

impl<'a> IntoIterator for &'a ColumnPlan {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_table::{ColumnDef, MemoryTable};
    use crate::types::CellValue;

    fn source() -> MemoryTable {
        MemoryTable::builder()
            .column(ColumnDef::new("name", ValueType::Text).header("Name"))
            .column(
                ColumnDef::new("amount", ValueType::Float)
                    .align(Alignment::End)
                    .format("$#,##0.00"),
            )
            .column(ColumnDef::new("date", ValueType::Date).collapsed())
            .column(ColumnDef::new("garbage", ValueType::Text).collapsed())
            .generated(ColumnDef::new("taxes", ValueType::Float).vertical(), |r| {
                CellValue::from(r.get("amount").as_f64().map(|a| a * 0.0825))
            })
            .visible_columns(["name", "date", "amount", "garbage"])
            .build()
    }

    fn ids(plan: &ColumnPlan) -> Vec<&str> {
        plan.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_visible_order_and_generated_appended() {
        let plan = ColumnPlan::build(&source(), &ExportOptions::default());
        assert_eq!(ids(&plan), vec!["name", "date", "amount", "garbage", "taxes"]);

        let taxes = plan.get("taxes").unwrap();
        assert!(taxes.is_generated);
        assert!(taxes.vertical);
        assert_eq!(taxes.value_type, ValueType::Float);
        assert_eq!(plan.get("name").unwrap().header, "Name");
        assert_eq!(plan.get("date").unwrap().header, "date");
    }

    #[test]
    fn test_collapsed_excluded_and_reincluded() {
        let options = ExportOptions::default().with_exclude_collapsed_columns(true);
        let plan = ColumnPlan::build(&source(), &options);
        assert_eq!(ids(&plan), vec!["name", "amount", "taxes"]);

        let options = options.reinclude_column("garbage");
        let plan = ColumnPlan::build(&source(), &options);
        assert_eq!(ids(&plan), vec!["name", "amount", "garbage", "taxes"]);
    }

    #[test]
    fn test_row_header_marks_first_remaining() {
        let options = ExportOptions::default()
            .with_row_headers(true)
            .with_column_order(["date", "name", "amount"])
            .with_exclude_collapsed_columns(true);
        let plan = ColumnPlan::build(&source(), &options);
        assert_eq!(ids(&plan), vec!["name", "amount", "taxes"]);
        assert!(plan.columns()[0].is_row_header);
        assert!(plan.columns()[1..].iter().all(|c| !c.is_row_header));
    }

    #[test]
    fn test_format_precedence() {
        let plan = ColumnPlan::build(&source(), &ExportOptions::default());
        assert_eq!(plan.get("amount").unwrap().format, None);

        let options = ExportOptions::default().with_source_format_override(true);
        let plan = ColumnPlan::build(&source(), &options);
        assert_eq!(plan.get("amount").unwrap().format.as_deref(), Some("$#,##0.00"));

        let options = options.with_column_format("amount", "0.0");
        let plan = ColumnPlan::build(&source(), &options);
        assert_eq!(plan.get("amount").unwrap().format.as_deref(), Some("0.0"));
    }

    #[test]
    fn test_empty_plan_is_allowed() {
        let table = MemoryTable::builder().build();
        let plan = ColumnPlan::build(&table, &ExportOptions::default().with_row_headers(true));
        assert!(plan.is_empty());
    }
}
