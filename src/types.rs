//! Type definitions for table cells and their decorations

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a single cell value read from a table source
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell
    Empty,
    /// Text value
    Text(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Date/time value
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Natural text representation, used when no pattern applies
    pub fn as_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Int(i) => itoa::Buffer::new().format(*i).to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(dt) => {
                if dt.time() == NaiveTime::MIN {
                    dt.date().format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }

    /// Check if cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Kind of the value, `None` for empty cells
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(_) => Some(ValueType::Text),
            CellValue::Int(_) => Some(ValueType::Integer),
            CellValue::Float(_) => Some(ValueType::Float),
            CellValue::Bool(_) => Some(ValueType::Boolean),
            CellValue::DateTime(_) => Some(ValueType::Date),
        }
    }

    /// Numeric view for aggregation; text is never parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(f) => Some(*f),
            CellValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i as i64)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::DateTime(d.and_time(NaiveTime::MIN))
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Empty, Into::into)
    }
}

/// Declared type of a column's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueType {
    Text,
    Integer,
    Float,
    Date,
    Boolean,
}

impl ValueType {
    /// Integral or floating-point
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Float)
    }
}

/// Horizontal alignment of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Alignment {
    #[default]
    Start,
    Center,
    End,
}

impl Alignment {
    /// SpreadsheetML `horizontal` attribute value
    pub fn as_xml(&self) -> &'static str {
        match self {
            Alignment::Start => "left",
            Alignment::Center => "center",
            Alignment::End => "right",
        }
    }
}

/// Which part of a sheet a cell belongs to; drives the font decoration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellRole {
    Title,
    Header,
    RowHeader,
    Data,
    Totals,
}

/// Font decoration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FontSpec {
    pub name: String,
    /// Size in points
    pub size: u16,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    pub fn new(name: impl Into<String>, size: u16) -> Self {
        FontSpec {
            name: name.into(),
            size,
            bold: false,
            italic: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        FontSpec::new("Calibri", 11)
    }
}

/// Fonts used for each cell role of a sheet
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SheetFonts {
    pub title: FontSpec,
    pub header: FontSpec,
    pub data: FontSpec,
    pub totals: FontSpec,
}

impl SheetFonts {
    pub fn for_role(&self, role: CellRole) -> &FontSpec {
        match role {
            CellRole::Title => &self.title,
            CellRole::Header | CellRole::RowHeader => &self.header,
            CellRole::Data => &self.data,
            CellRole::Totals => &self.totals,
        }
    }
}

impl Default for SheetFonts {
    fn default() -> Self {
        SheetFonts {
            title: FontSpec::new("Calibri", 14).bold(),
            header: FontSpec::default().bold(),
            data: FontSpec::default(),
            totals: FontSpec::default().bold(),
        }
    }
}

/// Decoration attached to a cell. Orthogonal to the cell's value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellStyle {
    pub role: CellRole,
    pub alignment: Alignment,
    /// Number/date format code, `None` for the General format
    pub num_format: Option<String>,
    /// Text rotated 90 degrees
    pub vertical: bool,
}

impl CellStyle {
    pub fn new(role: CellRole) -> Self {
        CellStyle {
            role,
            alignment: Alignment::Start,
            num_format: None,
            vertical: false,
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// Styled cell value (combines value with decoration)
#[derive(Debug, Clone, PartialEq)]
pub struct StyledCell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl StyledCell {
    pub fn new(value: CellValue, style: CellStyle) -> Self {
        StyledCell { value, style }
    }

    /// Text the cell shows, with its number/date format applied
    pub fn display(&self) -> String {
        crate::format::render(&self.value, self.style.num_format.as_deref())
    }
}

/// Convert a 1-based column number to Excel letters (1 -> A, 27 -> AA)
pub fn column_letter(col: u32) -> String {
    let mut result = String::new();
    push_column_letter(&mut result, col);
    result
}

/// Append the Excel letters of a 1-based column number
pub fn push_column_letter(buffer: &mut String, mut n: u32) {
    if n == 0 {
        return;
    }
    let mut tmp = [0u8; 8];
    let mut len = 0;
    while n > 0 {
        let rem = (n - 1) % 26;
        tmp[len] = b'A' + rem as u8;
        len += 1;
        n = (n - 1) / 26;
    }
    for &b in tmp[..len].iter().rev() {
        buffer.push(b as char);
    }
}

/// Excel-style cell reference for a 0-based row/column (e.g. "A1", "B2")
pub fn cell_reference(row: u32, col: u32) -> String {
    let mut s = column_letter(col + 1);
    s.push_str(itoa::Buffer::new().format(row + 1));
    s
}
