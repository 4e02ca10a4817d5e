//! Totals row computation
//!
//! Totals are accumulated while rows stream past, one slot per planned
//! column, so no row is ever revisited.

use crate::plan::{Column, ColumnPlan};
use crate::types::{CellValue, ValueType};

/// What the totals row holds for one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Arithmetic sum of the column's numeric values
    Sum,
    /// The configured totals label
    Label,
    /// Empty cell
    None,
}

/// Decides per column whether and how the totals row summarizes it
pub trait AggregationPolicy {
    fn aggregation(&self, column: &Column) -> Aggregation;
}

/// Default policy: sum numeric columns, label the row-header column, leave
/// everything else empty
#[derive(Debug, Clone, Copy, Default)]
pub struct SumNumericColumns;

impl AggregationPolicy for SumNumericColumns {
    fn aggregation(&self, column: &Column) -> Aggregation {
        if column.is_row_header {
            Aggregation::Label
        } else if column.is_numeric() {
            Aggregation::Sum
        } else {
            Aggregation::None
        }
    }
}

impl<F> AggregationPolicy for F
where
    F: Fn(&Column) -> Aggregation,
{
    fn aggregation(&self, column: &Column) -> Aggregation {
        self(column)
    }
}

/// Running sum. Integers stay exact until a float shows up; floats use
/// Neumaier compensation so the result does not depend on row order for
/// well-conditioned inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Sum {
    Int(i128),
    Float { sum: f64, compensation: f64 },
}

impl Sum {
    fn add(&mut self, value: &CellValue) {
        match (*self, value) {
            (Sum::Int(acc), CellValue::Int(i)) => *self = Sum::Int(acc + i128::from(*i)),
            (Sum::Int(acc), CellValue::Float(f)) => {
                *self = Sum::Float {
                    sum: acc as f64,
                    compensation: 0.0,
                };
                self.add_float(*f);
            }
            (Sum::Float { .. }, v) => {
                if let Some(f) = v.as_f64() {
                    self.add_float(f);
                }
            }
            _ => {}
        }
    }

    fn add_float(&mut self, x: f64) {
        if let Sum::Float { sum, compensation } = self {
            let t = *sum + x;
            if sum.abs() >= x.abs() {
                *compensation += (*sum - t) + x;
            } else {
                *compensation += (x - t) + *sum;
            }
            *sum = t;
        }
    }

    fn value(&self, float_column: bool) -> CellValue {
        match *self {
            Sum::Int(acc) if float_column => CellValue::Float(acc as f64),
            Sum::Int(acc) => i64::try_from(acc)
                .map(CellValue::Int)
                .unwrap_or(CellValue::Float(acc as f64)),
            Sum::Float { sum, compensation } => CellValue::Float(sum + compensation),
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Sum { sum: Sum, float_column: bool },
    Label,
    Empty,
}

/// Streaming accumulator for one sheet's totals row
#[derive(Debug, Clone)]
pub struct TotalsAccumulator {
    slots: Vec<Slot>,
}

impl TotalsAccumulator {
    pub fn new(plan: &ColumnPlan, policy: &dyn AggregationPolicy) -> Self {
        let slots = plan
            .iter()
            .map(|column| match policy.aggregation(column) {
                Aggregation::Sum => Slot::Sum {
                    sum: Sum::Int(0),
                    float_column: column.value_type != ValueType::Integer,
                },
                Aggregation::Label => Slot::Label,
                Aggregation::None => Slot::Empty,
            })
            .collect();
        TotalsAccumulator { slots }
    }

    /// Feed the raw value of column `index` for one row. Non-numeric values
    /// are ignored.
    pub fn push(&mut self, index: usize, value: &CellValue) {
        if let Some(Slot::Sum { sum, .. }) = self.slots.get_mut(index) {
            sum.add(value);
        }
    }

    /// Whether column `index` carries an aggregate
    pub fn is_aggregated(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Slot::Sum { .. }))
    }

    /// Totals row values in plan order
    pub fn finish(&self, label: &str) -> Vec<CellValue> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Sum { sum, float_column } => sum.value(*float_column),
                Slot::Label => CellValue::Text(label.to_string()),
                Slot::Empty => CellValue::Empty,
            })
            .collect()
    }
}

/// Aggregate one column over a sequence of values
///
/// ```
/// use tablestream::aggregate::{aggregate, SumNumericColumns};
/// use tablestream::plan::Column;
/// use tablestream::{Alignment, CellValue, ValueType};
///
/// let column = Column {
///     id: "amount".into(),
///     header: "Amount".into(),
///     alignment: Alignment::End,
///     value_type: ValueType::Float,
///     format: None,
///     is_generated: false,
///     is_row_header: false,
///     vertical: false,
/// };
/// let total = aggregate(&SumNumericColumns, &column, [CellValue::Float(750.0), CellValue::Float(1000.0)], "Total");
/// assert_eq!(total, Some(CellValue::Float(1750.0)));
/// ```
pub fn aggregate<I>(
    policy: &dyn AggregationPolicy,
    column: &Column,
    values: I,
    label: &str,
) -> Option<CellValue>
where
    I: IntoIterator<Item = CellValue>,
{
    let plan = ColumnPlan::from_columns(vec![column.clone()]);
    let mut acc = TotalsAccumulator::new(&plan, policy);
    for value in values {
        acc.push(0, &value);
    }
    acc.finish(label)
        .into_iter()
        .next()
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Alignment;

    fn column(id: &str, value_type: ValueType, row_header: bool) -> Column {
        Column {
            id: id.to_string(),
            header: id.to_string(),
            alignment: Alignment::Start,
            value_type,
            format: None,
            is_generated: false,
            is_row_header: row_header,
            vertical: false,
        }
    }

    fn plan() -> ColumnPlan {
        ColumnPlan::from_columns(vec![
            column("name", ValueType::Text, true),
            column("count", ValueType::Integer, false),
            column("amount", ValueType::Float, false),
            column("date", ValueType::Date, false),
        ])
    }

    #[test]
    fn test_default_policy() {
        let plan = plan();
        let cols = plan.columns();
        assert_eq!(SumNumericColumns.aggregation(&cols[0]), Aggregation::Label);
        assert_eq!(SumNumericColumns.aggregation(&cols[1]), Aggregation::Sum);
        assert_eq!(SumNumericColumns.aggregation(&cols[2]), Aggregation::Sum);
        assert_eq!(SumNumericColumns.aggregation(&cols[3]), Aggregation::None);

        // A numeric row-header column is labelled, not summed
        let id = column("id", ValueType::Integer, true);
        assert_eq!(SumNumericColumns.aggregation(&id), Aggregation::Label);
    }

    #[test]
    fn test_streaming_totals() {
        let mut acc = TotalsAccumulator::new(&plan(), &SumNumericColumns);
        let rows: [[CellValue; 4]; 2] = [
            ["Jane".into(), CellValue::Int(2), CellValue::Float(750.0), CellValue::Empty],
            ["John".into(), CellValue::Int(3), CellValue::Float(1000.0), CellValue::Empty],
        ];
        for row in &rows {
            for (i, v) in row.iter().enumerate() {
                acc.push(i, v);
            }
        }
        assert_eq!(
            acc.finish("Total"),
            vec![
                CellValue::Text("Total".into()),
                CellValue::Int(5),
                CellValue::Float(1750.0),
                CellValue::Empty,
            ]
        );
        assert!(acc.is_aggregated(1));
        assert!(!acc.is_aggregated(0));
    }

    #[test]
    fn test_no_rows_sums_to_zero() {
        let acc = TotalsAccumulator::new(&plan(), &SumNumericColumns);
        let totals = acc.finish("Total");
        assert_eq!(totals[1], CellValue::Int(0));
        assert_eq!(totals[2], CellValue::Float(0.0));
    }

    #[test]
    fn test_text_in_numeric_column_is_skipped() {
        let mut acc = TotalsAccumulator::new(&plan(), &SumNumericColumns);
        acc.push(2, &CellValue::Text("12".into()));
        acc.push(2, &CellValue::Float(0.5));
        acc.push(2, &CellValue::Int(2));
        assert_eq!(acc.finish("")[2], CellValue::Float(2.5));
    }

    #[test]
    fn test_compensated_sum() {
        let mut acc = TotalsAccumulator::new(&plan(), &SumNumericColumns);
        for v in [1e16, 1.0, -1e16] {
            acc.push(2, &CellValue::Float(v));
        }
        assert_eq!(acc.finish("")[2], CellValue::Float(1.0));
    }

    #[test]
    fn test_closure_policy() {
        let nothing = |_: &Column| Aggregation::None;
        let acc = TotalsAccumulator::new(&plan(), &nothing);
        assert!(acc.finish("Total").iter().all(CellValue::is_empty));
    }
}
