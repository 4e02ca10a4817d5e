//! Streaming XLSX writer
//!
//! This module provides the workbook container behind
//! [`WorkbookExport`](crate::writer::WorkbookExport):
//! - Worksheet XML generated directly, rows buffered in bounded windows
//! - Deflate compression on-the-fly into a non-seekable output
//! - Styles de-duplicated into a single `styles.xml`

pub mod memory;
pub mod streaming_zip_writer;
pub mod styles;
pub mod workbook;
pub mod worksheet;
pub mod xml_writer;

pub use memory::{StreamingProfile, MEMORY_LIMIT_ENV};
pub use streaming_zip_writer::StreamingZipWriter;
pub use styles::StyleRegistry;
pub use workbook::FastWorkbook;
pub use worksheet::WorksheetWriter;
pub use xml_writer::XmlWriter;
