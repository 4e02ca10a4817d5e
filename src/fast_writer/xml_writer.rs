//! Buffered XML writer with minimal allocations

use crate::error::Result;
use std::io::Write;

/// Fast XML writer; output is buffered and handed to the inner writer in
/// chunks of at least `chunk` bytes
pub struct XmlWriter<W: Write> {
    writer: W,
    buffer: Vec<u8>,
    chunk: usize,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_chunk_size(writer, 4096)
    }

    pub fn with_chunk_size(writer: W, chunk: usize) -> Self {
        XmlWriter {
            writer,
            buffer: Vec::with_capacity(chunk * 2),
            chunk: chunk.max(64),
        }
    }

    /// Write raw bytes directly
    #[inline]
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > self.chunk {
            self.drain()?;
        }
        Ok(())
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_raw(s.as_bytes())
    }

    /// XML declaration
    pub fn declaration(&mut self) -> Result<()> {
        self.write_raw(b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n")
    }

    /// Open a start tag: `<name`
    #[inline]
    pub fn start_element(&mut self, name: &str) -> Result<()> {
        self.write_raw(b"<")?;
        self.write_str(name)
    }

    #[inline]
    pub fn end_element(&mut self, name: &str) -> Result<()> {
        self.write_raw(b"</")?;
        self.write_str(name)?;
        self.write_raw(b">")
    }

    /// Close an open start tag as self-closing: `/>`
    #[inline]
    pub fn close_empty(&mut self) -> Result<()> {
        self.write_raw(b"/>")
    }

    #[inline]
    pub fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.write_raw(b" ")?;
        self.write_str(name)?;
        self.write_raw(b"=\"")?;
        self.write_escaped(value)?;
        self.write_raw(b"\"")
    }

    #[inline]
    pub fn attribute_int(&mut self, name: &str, value: u64) -> Result<()> {
        self.write_raw(b" ")?;
        self.write_str(name)?;
        self.write_raw(b"=\"")?;
        self.write_str(itoa::Buffer::new().format(value))?;
        self.write_raw(b"\"")
    }

    /// Close start tag
    #[inline]
    pub fn close_start_tag(&mut self) -> Result<()> {
        self.write_raw(b">")
    }

    /// Write text content with XML escaping. Control characters XML 1.0
    /// cannot carry are dropped.
    pub fn write_escaped(&mut self, text: &str) -> Result<()> {
        for byte in text.bytes() {
            match byte {
                b'&' => self.buffer.extend_from_slice(b"&amp;"),
                b'<' => self.buffer.extend_from_slice(b"&lt;"),
                b'>' => self.buffer.extend_from_slice(b"&gt;"),
                b'"' => self.buffer.extend_from_slice(b"&quot;"),
                b'\'' => self.buffer.extend_from_slice(b"&apos;"),
                b'\t' | b'\n' | b'\r' => self.buffer.push(byte),
                0x00..=0x1f => {}
                _ => self.buffer.push(byte),
            }
        }
        if self.buffer.len() > self.chunk {
            self.drain()?;
        }
        Ok(())
    }

    /// Bytes buffered but not yet handed to the inner writer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Hand buffered bytes to the inner writer without flushing it
    pub fn drain(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    /// Drain and flush the inner writer
    pub fn flush(&mut self) -> Result<()> {
        self.drain()?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Drain and return the inner writer
    pub fn into_inner(mut self) -> Result<W> {
        self.drain()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_writer() {
        let mut output = Vec::new();
        let mut writer = XmlWriter::new(&mut output);

        writer.start_element("root").unwrap();
        writer.attribute("attr", "value").unwrap();
        writer.attribute_int("n", 42).unwrap();
        writer.close_start_tag().unwrap();
        writer.write_str("content").unwrap();
        writer.start_element("leaf").unwrap();
        writer.close_empty().unwrap();
        writer.end_element("root").unwrap();
        writer.flush().unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "<root attr=\"value\" n=\"42\">content<leaf/></root>"
        );
    }

    #[test]
    fn test_xml_escaping() {
        let mut output = Vec::new();
        let mut writer = XmlWriter::new(&mut output);

        writer.write_escaped("<test>&\"value\"\u{1}</test>").unwrap();
        writer.flush().unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "&lt;test&gt;&amp;&quot;value&quot;&lt;/test&gt;"
        );
    }

    #[test]
    fn test_small_chunks_drain_early() {
        let mut writer = XmlWriter::with_chunk_size(Vec::new(), 64);
        for _ in 0..10 {
            writer.write_str("0123456789").unwrap();
        }
        assert!(writer.buffered() <= 64);
        let out = writer.into_inner().unwrap();
        assert_eq!(out.len(), 100);
    }
}
