//! Streaming workbook container
//!
//! Worksheets are compressed into the ZIP as their rows arrive; the parts
//! that depend on every sheet (workbook, relationships, content types,
//! styles) are written when the workbook closes.

use super::memory::StreamingProfile;
use super::streaming_zip_writer::StreamingZipWriter;
use super::styles::StyleRegistry;
use super::worksheet::WorksheetWriter;
use super::xml_writer::XmlWriter;
use crate::error::{ExportError, Result};
use crate::types::{SheetFonts, StyledCell};
use std::io::Write;

/// Streaming XLSX workbook
pub struct FastWorkbook<W: Write> {
    zip: StreamingZipWriter<W>,
    styles: StyleRegistry,
    fonts: SheetFonts,
    profile: StreamingProfile,
    worksheets: Vec<String>,
    current: Option<WorksheetWriter>,
}

impl<W: Write> FastWorkbook<W> {
    pub fn new(output: W, compression_level: u32) -> Self {
        FastWorkbook {
            zip: StreamingZipWriter::new(output, compression_level),
            styles: StyleRegistry::new(),
            fonts: SheetFonts::default(),
            profile: StreamingProfile::default(),
            worksheets: Vec::new(),
            current: None,
        }
    }

    pub fn with_fonts(mut self, fonts: SheetFonts) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_profile(mut self, profile: StreamingProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Start a worksheet, closing the previous one
    pub fn add_worksheet(&mut self, name: &str) -> Result<()> {
        self.finish_current_worksheet()?;

        let sheet_path = format!("xl/worksheets/sheet{}.xml", self.worksheets.len() + 1);
        self.zip.start_entry(&sheet_path)?;
        self.worksheets.push(name.to_string());
        self.current = Some(WorksheetWriter::new(self.profile)?);
        Ok(())
    }

    /// Write a row to the current worksheet
    pub fn write_row(&mut self, cells: &[StyledCell]) -> Result<()> {
        let sheet = self
            .current
            .as_mut()
            .ok_or_else(|| ExportError::Serialization("no active worksheet".to_string()))?;
        sheet.write_row(cells, &mut self.styles, &self.fonts)?;

        if sheet.window_full() {
            let window = sheet.take_window()?;
            self.zip.write_data(&window)?;
        }
        Ok(())
    }

    /// Merge columns `first..=last` (1-based) of the row just written
    pub fn merge_last_row(&mut self, first: u32, last: u32) {
        if let Some(sheet) = self.current.as_mut() {
            sheet.merge_last_row(first, last);
        }
    }

    /// Rows written to the current worksheet
    pub fn current_row(&self) -> u32 {
        self.current.as_ref().map_or(0, WorksheetWriter::row_count)
    }

    /// Compressed bytes emitted so far
    pub fn bytes_written(&self) -> u64 {
        self.zip.bytes_written()
    }

    /// Close the current worksheet, if any
    pub fn finish_current_worksheet(&mut self) -> Result<()> {
        if let Some(sheet) = self.current.take() {
            let tail = sheet.finish()?;
            self.zip.write_data(&tail)?;
        }
        Ok(())
    }

    /// Write the remaining parts and return the output
    pub fn close(mut self) -> Result<W> {
        self.finish_current_worksheet()?;

        self.zip.start_entry("[Content_Types].xml")?;
        self.write_content_types()?;

        self.zip.start_entry("_rels/.rels")?;
        self.zip.write_data(ROOT_RELS.as_bytes())?;

        self.zip.start_entry("docProps/core.xml")?;
        self.write_core_props()?;

        self.zip.start_entry("docProps/app.xml")?;
        self.zip.write_data(APP_PROPS.as_bytes())?;

        self.zip.start_entry("xl/workbook.xml")?;
        self.write_workbook_xml()?;

        self.zip.start_entry("xl/_rels/workbook.xml.rels")?;
        self.write_workbook_rels()?;

        self.zip.start_entry("xl/styles.xml")?;
        {
            let mut xml = XmlWriter::new(&mut self.zip);
            self.styles.write_xml(&mut xml)?;
            xml.drain()?;
        }

        self.zip.finish()
    }

    fn write_content_types(&mut self) -> Result<()> {
        let mut xml = XmlWriter::new(&mut self.zip);
        xml.declaration()?;
        xml.write_str(
            "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
             <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
        )?;
        for i in 1..=self.worksheets.len() {
            xml.start_element("Override")?;
            xml.attribute("PartName", &format!("/xl/worksheets/sheet{}.xml", i))?;
            xml.attribute(
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
            )?;
            xml.close_empty()?;
        }
        xml.write_str(
            "<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>\
             <Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\
             <Override PartName=\"/docProps/app.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.extended-properties+xml\"/>\
             </Types>",
        )?;
        xml.drain()
    }

    fn write_core_props(&mut self) -> Result<()> {
        let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let mut xml = XmlWriter::new(&mut self.zip);
        xml.declaration()?;
        xml.write_str(
            "<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
             xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
             <dc:creator>tablestream</dc:creator>",
        )?;
        for tag in ["dcterms:created", "dcterms:modified"] {
            xml.start_element(tag)?;
            xml.attribute("xsi:type", "dcterms:W3CDTF")?;
            xml.close_start_tag()?;
            xml.write_str(&now)?;
            xml.end_element(tag)?;
        }
        xml.end_element("cp:coreProperties")?;
        xml.drain()
    }

    fn write_workbook_xml(&mut self) -> Result<()> {
        let mut xml = XmlWriter::new(&mut self.zip);
        xml.declaration()?;
        xml.start_element("workbook")?;
        xml.attribute("xmlns", "http://schemas.openxmlformats.org/spreadsheetml/2006/main")?;
        xml.attribute(
            "xmlns:r",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
        )?;
        xml.close_start_tag()?;

        xml.start_element("sheets")?;
        xml.close_start_tag()?;
        for (i, name) in self.worksheets.iter().enumerate() {
            let sheet_id = i as u64 + 1;
            xml.start_element("sheet")?;
            xml.attribute("name", name)?;
            xml.attribute_int("sheetId", sheet_id)?;
            xml.attribute("r:id", &format!("rId{}", sheet_id))?;
            xml.close_empty()?;
        }
        xml.end_element("sheets")?;
        xml.end_element("workbook")?;
        xml.drain()
    }

    fn write_workbook_rels(&mut self) -> Result<()> {
        let count = self.worksheets.len();
        let mut xml = XmlWriter::new(&mut self.zip);
        xml.declaration()?;
        xml.start_element("Relationships")?;
        xml.attribute("xmlns", "http://schemas.openxmlformats.org/package/2006/relationships")?;
        xml.close_start_tag()?;

        for rid in 1..=count {
            xml.start_element("Relationship")?;
            xml.attribute("Id", &format!("rId{}", rid))?;
            xml.attribute(
                "Type",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet",
            )?;
            xml.attribute("Target", &format!("worksheets/sheet{}.xml", rid))?;
            xml.close_empty()?;
        }

        xml.start_element("Relationship")?;
        xml.attribute("Id", &format!("rId{}", count + 1))?;
        xml.attribute(
            "Type",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles",
        )?;
        xml.attribute("Target", "styles.xml")?;
        xml.close_empty()?;

        xml.end_element("Relationships")?;
        xml.drain()
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const APP_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>tablestream</Application>
<DocSecurity>0</DocSecurity>
<ScaleCrop>false</ScaleCrop>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
</Properties>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellRole, CellStyle, CellValue};
    use std::io::{Cursor, Read};

    fn text(s: &str) -> StyledCell {
        StyledCell::new(CellValue::Text(s.to_string()), CellStyle::new(CellRole::Data))
    }

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_fast_workbook() -> Result<()> {
        let mut workbook = FastWorkbook::new(Vec::new(), 6);
        workbook.add_worksheet("People")?;
        workbook.write_row(&[text("Name"), text("Age")])?;
        workbook.write_row(&[text("Alice"), text("30")])?;
        assert_eq!(workbook.current_row(), 2);
        workbook.add_worksheet("Other & more")?;
        workbook.write_row(&[text("x")])?;
        let bytes = workbook.close()?;

        let wb = part(&bytes, "xl/workbook.xml");
        assert!(wb.contains("<sheet name=\"People\" sheetId=\"1\" r:id=\"rId1\"/>"));
        assert!(wb.contains("<sheet name=\"Other &amp; more\" sheetId=\"2\" r:id=\"rId2\"/>"));

        let sheet1 = part(&bytes, "xl/worksheets/sheet1.xml");
        assert_eq!(sheet1.matches("<row ").count(), 2);
        assert!(sheet1.contains("Alice"));

        let types = part(&bytes, "[Content_Types].xml");
        assert!(types.contains("/xl/worksheets/sheet2.xml"));
        Ok(())
    }

    #[test]
    fn test_windowed_flush_keeps_rows() -> Result<()> {
        let profile = StreamingProfile::Custom {
            flush_interval: 3,
            max_buffer_size: 1024,
        };
        let mut workbook = FastWorkbook::new(Vec::new(), 1).with_profile(profile);
        workbook.add_worksheet("Big")?;
        for i in 0..100 {
            workbook.write_row(&[StyledCell::new(
                CellValue::Int(i),
                CellStyle::new(CellRole::Data),
            )])?;
        }
        let bytes = workbook.close()?;
        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
        assert_eq!(sheet.matches("<row ").count(), 100);
        assert!(sheet.contains("<c r=\"A100\"><v>99</v></c>"));
        Ok(())
    }

    #[test]
    fn test_write_without_sheet_fails() {
        let mut workbook = FastWorkbook::new(Vec::new(), 6);
        assert!(workbook.write_row(&[text("x")]).is_err());
    }
}
