//! The table-source contract consumed by the export engines

use crate::error::SourceError;
use crate::types::{Alignment, CellValue, ValueType};
use std::fmt;

/// A table-like data source: ordered items, named typed columns, column
/// presentation state and optional computed columns.
///
/// Only `item_ids`, `visible_columns`, `property_type` and `property_value`
/// are required; the presentation hooks default to "no decoration".
pub trait TableSource {
    /// Identifier of one item (row). `Debug` output appears in error context.
    type ItemId: fmt::Debug;

    /// Items in export order. Consumed lazily, one row at a time.
    fn item_ids(&self) -> Box<dyn Iterator<Item = Self::ItemId> + '_>;

    /// Column ids in display order; generated column ids may appear here
    fn visible_columns(&self) -> Vec<String>;

    /// Declared type of a stored column, `None` if the column is unknown
    fn property_type(&self, column_id: &str) -> Option<ValueType>;

    /// Stored value of one item/column pair
    fn property_value(&self, item: &Self::ItemId, column_id: &str)
        -> Result<CellValue, SourceError>;

    fn is_collapsed(&self, _column_id: &str) -> bool {
        false
    }

    /// Computed columns; an id not listed in `visible_columns` is appended
    fn generated_columns(&self) -> &[GeneratedColumn<Self::ItemId>] {
        &[]
    }

    /// Header text, defaults to the column id
    fn column_header(&self, _column_id: &str) -> Option<String> {
        None
    }

    fn column_alignment(&self, _column_id: &str) -> Alignment {
        Alignment::Start
    }

    /// Source-declared pattern, used when the export prefers source formats
    fn column_format(&self, _column_id: &str) -> Option<String> {
        None
    }

    /// Render the column's cells rotated (vertical text)
    fn is_vertical_text(&self, _column_id: &str) -> bool {
        false
    }
}

type Evaluator<I> = Box<dyn Fn(&I, &str) -> Result<CellValue, SourceError> + Send + Sync>;

/// A column whose value is computed per item instead of read from storage
pub struct GeneratedColumn<I> {
    id: String,
    value_type: ValueType,
    evaluator: Evaluator<I>,
}

impl<I> GeneratedColumn<I> {
    /// Infallible generator
    ///
    /// ```
    /// use tablestream::{CellValue, GeneratedColumn, ValueType};
    ///
    /// let taxes = GeneratedColumn::new("taxes", ValueType::Float, |amount: &f64| {
    ///     CellValue::Float(amount * 0.0825)
    /// });
    /// assert_eq!(taxes.evaluate(&1000.0, "taxes").unwrap(), CellValue::Float(82.5));
    /// ```
    pub fn new<F>(id: impl Into<String>, value_type: ValueType, generator: F) -> Self
    where
        F: Fn(&I) -> CellValue + Send + Sync + 'static,
    {
        GeneratedColumn {
            id: id.into(),
            value_type,
            evaluator: Box::new(move |item, _| Ok(generator(item))),
        }
    }

    /// Generator that receives the column id and may fail
    pub fn try_new<F>(id: impl Into<String>, value_type: ValueType, generator: F) -> Self
    where
        F: Fn(&I, &str) -> Result<CellValue, SourceError> + Send + Sync + 'static,
    {
        GeneratedColumn {
            id: id.into(),
            value_type,
            evaluator: Box::new(generator),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared type of the generated values
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn evaluate(&self, item: &I, column_id: &str) -> Result<CellValue, SourceError> {
        (self.evaluator)(item, column_id)
    }
}

impl<I> fmt::Debug for GeneratedColumn<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedColumn")
            .field("id", &self.id)
            .field("value_type", &self.value_type)
            .finish_non_exhaustive()
    }
}
