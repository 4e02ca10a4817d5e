//! Cell format registry backing `xl/styles.xml`
//!
//! Fonts, number formats and cell formats (`xf` records) are de-duplicated
//! as cells are written; the stylesheet itself is emitted when the workbook
//! closes.

use super::xml_writer::XmlWriter;
use crate::error::Result;
use crate::types::{Alignment, CellStyle, FontSpec, SheetFonts};
use indexmap::IndexSet;
use std::io::Write;

/// First id available for custom number formats
const FIRST_CUSTOM_NUM_FMT: u32 = 164;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Xf {
    font: u32,
    num_fmt: u32,
    alignment: Alignment,
    vertical: bool,
}

/// De-duplicating registry of workbook cell formats
#[derive(Debug)]
pub struct StyleRegistry {
    fonts: IndexSet<FontSpec>,
    num_formats: IndexSet<String>,
    xfs: IndexSet<Xf>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        let mut fonts = IndexSet::new();
        fonts.insert(FontSpec::default());
        let mut xfs = IndexSet::new();
        xfs.insert(Xf {
            font: 0,
            num_fmt: 0,
            alignment: Alignment::Start,
            vertical: false,
        });
        StyleRegistry {
            fonts,
            num_formats: IndexSet::new(),
            xfs,
        }
    }

    /// `s` attribute value for a cell style
    pub fn cell_format(&mut self, style: &CellStyle, fonts: &SheetFonts) -> u32 {
        let font = self.fonts.insert_full(fonts.for_role(style.role).clone()).0 as u32;
        let num_fmt = style
            .num_format
            .as_deref()
            .map_or(0, |code| self.num_format_id(code));
        self.xfs
            .insert_full(Xf {
                font,
                num_fmt,
                alignment: style.alignment,
                vertical: style.vertical,
            })
            .0 as u32
    }

    fn num_format_id(&mut self, code: &str) -> u32 {
        if let Some(id) = builtin_num_format(code) {
            return id;
        }
        let (index, _) = self.num_formats.insert_full(code.to_string());
        FIRST_CUSTOM_NUM_FMT + index as u32
    }

    /// Number of distinct cell formats, the default included
    pub fn len(&self) -> usize {
        self.xfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xfs.is_empty()
    }

    pub fn write_xml<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.declaration()?;
        xml.start_element("styleSheet")?;
        xml.attribute("xmlns", "http://schemas.openxmlformats.org/spreadsheetml/2006/main")?;
        xml.close_start_tag()?;

        if !self.num_formats.is_empty() {
            xml.start_element("numFmts")?;
            xml.attribute_int("count", self.num_formats.len() as u64)?;
            xml.close_start_tag()?;
            for (i, code) in self.num_formats.iter().enumerate() {
                xml.start_element("numFmt")?;
                xml.attribute_int("numFmtId", u64::from(FIRST_CUSTOM_NUM_FMT) + i as u64)?;
                xml.attribute("formatCode", code)?;
                xml.close_empty()?;
            }
            xml.end_element("numFmts")?;
        }

        xml.start_element("fonts")?;
        xml.attribute_int("count", self.fonts.len() as u64)?;
        xml.close_start_tag()?;
        for font in &self.fonts {
            xml.write_str("<font>")?;
            if font.bold {
                xml.write_str("<b/>")?;
            }
            if font.italic {
                xml.write_str("<i/>")?;
            }
            xml.start_element("sz")?;
            xml.attribute_int("val", u64::from(font.size))?;
            xml.close_empty()?;
            xml.start_element("name")?;
            xml.attribute("val", &font.name)?;
            xml.close_empty()?;
            xml.write_str("</font>")?;
        }
        xml.end_element("fonts")?;

        xml.write_str(
            "<fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill>\
             <fill><patternFill patternType=\"gray125\"/></fill></fills>\
             <borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>\
             <cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>",
        )?;

        xml.start_element("cellXfs")?;
        xml.attribute_int("count", self.xfs.len() as u64)?;
        xml.close_start_tag()?;
        for xf in &self.xfs {
            xml.start_element("xf")?;
            xml.attribute_int("numFmtId", u64::from(xf.num_fmt))?;
            xml.attribute_int("fontId", u64::from(xf.font))?;
            xml.write_str(" fillId=\"0\" borderId=\"0\" xfId=\"0\"")?;
            if xf.num_fmt != 0 {
                xml.write_str(" applyNumberFormat=\"1\"")?;
            }
            if xf.font != 0 {
                xml.write_str(" applyFont=\"1\"")?;
            }
            let aligned = xf.alignment != Alignment::Start || xf.vertical;
            if !aligned {
                xml.close_empty()?;
                continue;
            }
            xml.write_str(" applyAlignment=\"1\">")?;
            xml.start_element("alignment")?;
            if xf.alignment != Alignment::Start {
                xml.attribute("horizontal", xf.alignment.as_xml())?;
            }
            if xf.vertical {
                xml.attribute("textRotation", "90")?;
            }
            xml.close_empty()?;
            xml.end_element("xf")?;
        }
        xml.end_element("cellXfs")?;

        xml.write_str(
            "<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>",
        )?;
        xml.end_element("styleSheet")?;
        Ok(())
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_num_format(code: &str) -> Option<u32> {
    Some(match code {
        "0" => 1,
        "0.00" => 2,
        "#,##0" => 3,
        "#,##0.00" => 4,
        "0%" => 9,
        "0.00%" => 10,
        "mm-dd-yy" => 14,
        "h:mm" => 20,
        "h:mm:ss" => 21,
        _ => return None,
    })
}
