//! In-memory [`TableSource`] for callers that already hold their rows

use crate::error::SourceError;
use crate::source::{GeneratedColumn, TableSource};
use crate::types::{Alignment, CellValue, ValueType};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// One stored row; the item id handed to generators
pub struct Record {
    index: usize,
    values: IndexMap<String, CellValue>,
}

impl Record {
    /// Position of the row in the table
    pub fn index(&self) -> usize {
        self.index
    }

    /// Stored value, `Empty` when the column has none
    pub fn get(&self, column_id: &str) -> &CellValue {
        self.values.get(column_id).unwrap_or(&CellValue::Empty)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.index)
    }
}

/// Column declaration for [`MemoryTable`]
#[derive(Debug, Clone)]
pub struct ColumnDef {
    id: String,
    value_type: ValueType,
    header: Option<String>,
    alignment: Alignment,
    collapsed: bool,
    format: Option<String>,
    vertical: bool,
}

impl ColumnDef {
    pub fn new(id: impl Into<String>, value_type: ValueType) -> Self {
        ColumnDef {
            id: id.into(),
            value_type,
            header: None,
            alignment: Alignment::Start,
            collapsed: false,
            format: None,
            vertical: false,
        }
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn collapsed(mut self) -> Self {
        self.collapsed = true;
        self
    }

    /// Source-declared pattern
    pub fn format(mut self, pattern: impl Into<String>) -> Self {
        self.format = Some(pattern.into());
        self
    }

    pub fn vertical(mut self) -> Self {
        self.vertical = true;
        self
    }
}

/// Table held in memory, row values keyed by column id
///
/// # Examples
///
/// ```
/// use tablestream::{CellValue, ColumnDef, MemoryTable, TableSource, ValueType};
///
/// let table = MemoryTable::builder()
///     .column(ColumnDef::new("name", ValueType::Text).header("Name"))
///     .column(ColumnDef::new("amount", ValueType::Float))
///     .generated(ColumnDef::new("taxes", ValueType::Float), |row| {
///         CellValue::from(row.get("amount").as_f64().map(|a| a * 0.0825))
///     })
///     .row(vec!["Jane".into(), 750.0.into()])
///     .build();
///
/// assert_eq!(table.visible_columns(), vec!["name", "amount", "taxes"]);
/// ```
pub struct MemoryTable {
    columns: IndexMap<String, ColumnDef>,
    visible: Vec<String>,
    rows: Vec<Arc<Record>>,
    generated: Vec<GeneratedColumn<Arc<Record>>>,
}

impl MemoryTable {
    pub fn builder() -> MemoryTableBuilder {
        MemoryTableBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Collapse or expand a column
    pub fn set_collapsed(&mut self, column_id: &str, collapsed: bool) {
        if let Some(def) = self.columns.get_mut(column_id) {
            def.collapsed = collapsed;
        }
    }

    pub fn set_visible_columns<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible = columns.into_iter().map(Into::into).collect();
    }
}

impl fmt::Debug for MemoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTable")
            .field("columns", &self.columns.keys().collect::<Vec<_>>())
            .field("rows", &self.rows.len())
            .finish()
    }
}

impl TableSource for MemoryTable {
    type ItemId = Arc<Record>;

    fn item_ids(&self) -> Box<dyn Iterator<Item = Arc<Record>> + '_> {
        Box::new(self.rows.iter().cloned())
    }

    fn visible_columns(&self) -> Vec<String> {
        self.visible.clone()
    }

    fn property_type(&self, column_id: &str) -> Option<ValueType> {
        self.columns.get(column_id).map(|c| c.value_type)
    }

    fn property_value(&self, item: &Arc<Record>, column_id: &str) -> Result<CellValue, SourceError> {
        if !self.columns.contains_key(column_id) {
            return Err(SourceError::unknown_column(column_id));
        }
        Ok(item.get(column_id).clone())
    }

    fn is_collapsed(&self, column_id: &str) -> bool {
        self.columns.get(column_id).is_some_and(|c| c.collapsed)
    }

    fn generated_columns(&self) -> &[GeneratedColumn<Arc<Record>>] {
        &self.generated
    }

    fn column_header(&self, column_id: &str) -> Option<String> {
        self.columns.get(column_id).and_then(|c| c.header.clone())
    }

    fn column_alignment(&self, column_id: &str) -> Alignment {
        self.columns
            .get(column_id)
            .map_or(Alignment::Start, |c| c.alignment)
    }

    fn column_format(&self, column_id: &str) -> Option<String> {
        self.columns.get(column_id).and_then(|c| c.format.clone())
    }

    fn is_vertical_text(&self, column_id: &str) -> bool {
        self.columns.get(column_id).is_some_and(|c| c.vertical)
    }
}

/// Builder for [`MemoryTable`]
#[derive(Default)]
pub struct MemoryTableBuilder {
    columns: IndexMap<String, ColumnDef>,
    stored: Vec<String>,
    visible: Option<Vec<String>>,
    rows: Vec<Vec<CellValue>>,
    generated: Vec<GeneratedColumn<Arc<Record>>>,
}

impl MemoryTableBuilder {
    /// Declare a stored column; row values are given in declaration order
    pub fn column(mut self, def: ColumnDef) -> Self {
        self.stored.push(def.id.clone());
        self.columns.insert(def.id.clone(), def);
        self
    }

    /// Declare a computed column
    pub fn generated<F>(mut self, def: ColumnDef, generator: F) -> Self
    where
        F: Fn(&Record) -> CellValue + Send + Sync + 'static,
    {
        self.generated.push(GeneratedColumn::new(
            def.id.clone(),
            def.value_type,
            move |record: &Arc<Record>| generator(record),
        ));
        self.columns.insert(def.id.clone(), def);
        self
    }

    /// Display order; defaults to declaration order
    pub fn visible_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Append a row. Missing trailing values are empty; extra values are ignored.
    pub fn row(mut self, values: Vec<CellValue>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn build(self) -> MemoryTable {
        let stored = self.stored;
        let rows = self
            .rows
            .into_iter()
            .enumerate()
            .map(|(index, values)| {
                let values = stored.iter().cloned().zip(values).collect();
                Arc::new(Record { index, values })
            })
            .collect();
        let visible = self
            .visible
            .unwrap_or_else(|| self.columns.keys().cloned().collect());

        MemoryTable {
            columns: self.columns,
            visible,
            rows,
            generated: self.generated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MemoryTable {
        MemoryTable::builder()
            .column(ColumnDef::new("name", ValueType::Text))
            .column(ColumnDef::new("amount", ValueType::Float).collapsed())
            .row(vec!["Jane".into(), 750.0.into()])
            .row(vec!["John".into()])
            .build()
    }

    #[test]
    fn test_values_by_column() {
        let t = table();
        let rows: Vec<_> = t.item_ids().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(t.property_value(&rows[0], "amount").unwrap(), CellValue::Float(750.0));
        assert_eq!(t.property_value(&rows[1], "amount").unwrap(), CellValue::Empty);
        assert!(t.property_value(&rows[0], "nope").is_err());
    }

    #[test]
    fn test_collapse_toggle() {
        let mut t = table();
        assert!(t.is_collapsed("amount"));
        t.set_collapsed("amount", false);
        assert!(!t.is_collapsed("amount"));
    }

    #[test]
    fn test_record_debug_is_short() {
        let t = table();
        let first = t.item_ids().next().unwrap();
        assert_eq!(format!("{:?}", first), "row 0");
    }
}
