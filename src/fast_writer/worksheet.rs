//! Worksheet XML with typed, styled cells
//!
//! Rows are encoded into a window buffer. The owning workbook hands the
//! window to the compressor whenever [`WorksheetWriter::window_full`] says
//! so, which bounds memory no matter how many rows a sheet has.

use super::memory::StreamingProfile;
use super::styles::StyleRegistry;
use super::xml_writer::XmlWriter;
use crate::error::Result;
use crate::format::excel_serial;
use crate::types::{push_column_letter, CellStyle, CellValue, SheetFonts, StyledCell};

/// Format used for dates that arrive without one
const FALLBACK_DATE_FORMAT: &str = "yyyy-mm-dd";

/// Streaming writer for one worksheet part
pub struct WorksheetWriter {
    xml: XmlWriter<Vec<u8>>,
    row: u32,
    rows_in_window: u32,
    merges: Vec<String>,
    profile: StreamingProfile,
    cell_ref: String,
}

impl WorksheetWriter {
    /// Start the part: declaration, `worksheet` and `sheetData` open tags
    pub fn new(profile: StreamingProfile) -> Result<Self> {
        let mut xml = XmlWriter::new(Vec::with_capacity(profile.max_buffer_size().min(64 * 1024)));
        xml.declaration()?;
        xml.start_element("worksheet")?;
        xml.attribute("xmlns", "http://schemas.openxmlformats.org/spreadsheetml/2006/main")?;
        xml.attribute(
            "xmlns:r",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
        )?;
        xml.close_start_tag()?;
        xml.start_element("sheetData")?;
        xml.close_start_tag()?;

        Ok(WorksheetWriter {
            xml,
            row: 0,
            rows_in_window: 0,
            merges: Vec::new(),
            profile,
            cell_ref: String::with_capacity(12),
        })
    }

    /// Append one row of cells starting at column A
    pub fn write_row(
        &mut self,
        cells: &[StyledCell],
        styles: &mut StyleRegistry,
        fonts: &SheetFonts,
    ) -> Result<()> {
        self.row += 1;
        self.rows_in_window += 1;
        let mut row_buf = itoa::Buffer::new();
        let row_str = row_buf.format(self.row);

        self.xml.start_element("row")?;
        self.xml.attribute("r", row_str)?;
        self.xml.close_start_tag()?;

        for (col, cell) in cells.iter().enumerate() {
            self.cell_ref.clear();
            push_column_letter(&mut self.cell_ref, col as u32 + 1);
            self.cell_ref.push_str(row_str);

            let style_id = match (&cell.value, &cell.style.num_format) {
                (CellValue::DateTime(_), None) => {
                    let style = CellStyle {
                        num_format: Some(FALLBACK_DATE_FORMAT.to_string()),
                        ..cell.style.clone()
                    };
                    styles.cell_format(&style, fonts)
                }
                _ => styles.cell_format(&cell.style, fonts),
            };
            write_cell(&mut self.xml, &self.cell_ref, style_id, &cell.value)?;
        }

        self.xml.end_element("row")?;
        Ok(())
    }

    /// Merge columns `first..=last` (1-based) of the last written row
    pub fn merge_last_row(&mut self, first: u32, last: u32) {
        if last <= first || self.row == 0 {
            return;
        }
        let mut range = String::with_capacity(16);
        let row = itoa::Buffer::new().format(self.row).to_string();
        push_column_letter(&mut range, first);
        range.push_str(&row);
        range.push(':');
        push_column_letter(&mut range, last);
        range.push_str(&row);
        self.merges.push(range);
    }

    /// Whether the buffered window should be handed to the compressor
    pub fn window_full(&self) -> bool {
        self.rows_in_window >= self.profile.flush_interval()
            || self.buffered() >= self.profile.max_buffer_size()
    }

    fn buffered(&self) -> usize {
        // The XmlWriter's inner Vec is the window
        self.xml.buffered() + self.xml.get_ref().len()
    }

    /// Take the buffered XML, leaving the window empty
    pub fn take_window(&mut self) -> Result<Vec<u8>> {
        self.xml.drain()?;
        self.rows_in_window = 0;
        Ok(std::mem::take(self.xml.get_mut()))
    }

    /// Rows written so far
    pub fn row_count(&self) -> u32 {
        self.row
    }

    /// Close the part and return the remaining XML
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.xml.end_element("sheetData")?;
        if !self.merges.is_empty() {
            self.xml.start_element("mergeCells")?;
            self.xml.attribute_int("count", self.merges.len() as u64)?;
            self.xml.close_start_tag()?;
            for range in &self.merges {
                self.xml.start_element("mergeCell")?;
                self.xml.attribute("ref", range)?;
                self.xml.close_empty()?;
            }
            self.xml.end_element("mergeCells")?;
        }
        self.xml.end_element("worksheet")?;
        self.xml.into_inner()
    }
}

fn write_cell(xml: &mut XmlWriter<Vec<u8>>, reference: &str, style: u32, value: &CellValue) -> Result<()> {
    xml.start_element("c")?;
    xml.attribute("r", reference)?;
    if style != 0 {
        xml.attribute_int("s", u64::from(style))?;
    }

    match value {
        CellValue::Empty => return xml.close_empty(),
        CellValue::Text(text) => return write_inline_string(xml, text),
        CellValue::Float(f) if !f.is_finite() => return write_inline_string(xml, &f.to_string()),
        CellValue::Bool(b) => {
            xml.attribute("t", "b")?;
            xml.close_start_tag()?;
            xml.write_str(if *b { "<v>1</v>" } else { "<v>0</v>" })?;
        }
        CellValue::Int(i) => {
            xml.close_start_tag()?;
            xml.write_str("<v>")?;
            xml.write_str(itoa::Buffer::new().format(*i))?;
            xml.write_str("</v>")?;
        }
        CellValue::Float(f) => {
            xml.close_start_tag()?;
            xml.write_str("<v>")?;
            xml.write_str(&f.to_string())?;
            xml.write_str("</v>")?;
        }
        CellValue::DateTime(dt) => {
            xml.close_start_tag()?;
            xml.write_str("<v>")?;
            xml.write_str(&excel_serial(dt).to_string())?;
            xml.write_str("</v>")?;
        }
    }
    xml.end_element("c")
}

fn write_inline_string(xml: &mut XmlWriter<Vec<u8>>, text: &str) -> Result<()> {
    xml.attribute("t", "inlineStr")?;
    xml.close_start_tag()?;
    xml.write_str("<is><t xml:space=\"preserve\">")?;
    xml.write_escaped(text)?;
    xml.write_str("</t></is>")?;
    xml.end_element("c")
}
