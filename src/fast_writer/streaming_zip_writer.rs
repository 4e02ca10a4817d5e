//! Streaming ZIP writer that compresses parts on-the-fly
//!
//! Entries are written sequentially with the data-descriptor flag, so the
//! output never needs to be seekable: a `Vec<u8>`, a file or a socket all
//! work. Only the central directory (one small record per entry) is kept in
//! memory.

use crate::error::{ExportError, Result};
use crc32fast::Hasher as Crc32;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{self, Write};

// 1980-01-01 00:00:00, the earliest DOS timestamp; keeps output reproducible
const DOS_TIME: u16 = 0;
const DOS_DATE: u16 = (1 << 5) | 1;

const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
const FLAG_UTF8: u16 = 1 << 11;
const METHOD_DEFLATE: u16 = 8;
const VERSION: u16 = 20;

/// Entry already written, kept for the central directory
struct ZipEntry {
    name: String,
    local_header_offset: u32,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
}

/// Writer that counts the bytes passing through it
struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct CurrentEntry<W: Write> {
    name: String,
    local_header_offset: u32,
    data_offset: u64,
    crc: Crc32,
    uncompressed_size: u64,
    encoder: DeflateEncoder<CountingWriter<W>>,
}

enum State<W: Write> {
    Idle(CountingWriter<W>),
    Entry(CurrentEntry<W>),
    /// A write failed; the container is unusable
    Broken,
}

/// Streaming ZIP writer that compresses data on-the-fly
pub struct StreamingZipWriter<W: Write> {
    state: State<W>,
    entries: Vec<ZipEntry>,
    compression: Compression,
}

impl<W: Write> StreamingZipWriter<W> {
    pub fn new(output: W, compression_level: u32) -> Self {
        StreamingZipWriter {
            state: State::Idle(CountingWriter {
                inner: output,
                written: 0,
            }),
            entries: Vec::new(),
            compression: Compression::new(compression_level.min(9)),
        }
    }

    /// Bytes emitted to the output so far
    pub fn bytes_written(&self) -> u64 {
        match &self.state {
            State::Idle(out) => out.written,
            State::Entry(entry) => entry.encoder.get_ref().written,
            State::Broken => 0,
        }
    }

    /// Start a new entry (file) in the ZIP, finishing the previous one
    pub fn start_entry(&mut self, name: &str) -> Result<()> {
        self.finish_current_entry()?;

        let mut out = match std::mem::replace(&mut self.state, State::Broken) {
            State::Idle(out) => out,
            _ => return Err(broken()),
        };

        let local_header_offset = zip32(out.written, "archive offset")?;
        let name_len = u16::try_from(name.len())
            .map_err(|_| ExportError::Serialization(format!("entry name too long: {}", name)))?;

        let mut header = Vec::with_capacity(30 + name.len());
        header.extend_from_slice(&[0x50, 0x4b, 0x03, 0x04]);
        header.extend_from_slice(&VERSION.to_le_bytes());
        header.extend_from_slice(&(FLAG_DATA_DESCRIPTOR | FLAG_UTF8).to_le_bytes());
        header.extend_from_slice(&METHOD_DEFLATE.to_le_bytes());
        header.extend_from_slice(&DOS_TIME.to_le_bytes());
        header.extend_from_slice(&DOS_DATE.to_le_bytes());
        // crc32, compressed and uncompressed sizes follow in the descriptor
        header.extend_from_slice(&[0; 12]);
        header.extend_from_slice(&name_len.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // extra len
        header.extend_from_slice(name.as_bytes());
        out.write_all(&header)?;

        let data_offset = out.written;
        self.state = State::Entry(CurrentEntry {
            name: name.to_string(),
            local_header_offset,
            data_offset,
            crc: Crc32::new(),
            uncompressed_size: 0,
            encoder: DeflateEncoder::new(out, self.compression),
        });
        Ok(())
    }

    /// Write uncompressed data to the current entry
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        match &mut self.state {
            State::Entry(entry) => {
                entry.crc.update(data);
                entry.uncompressed_size += data.len() as u64;
                if let Err(err) = entry.encoder.write_all(data) {
                    self.state = State::Broken;
                    return Err(err.into());
                }
                Ok(())
            }
            State::Idle(_) => Err(ExportError::Serialization(
                "no ZIP entry started".to_string(),
            )),
            State::Broken => Err(broken()),
        }
    }

    /// Push buffered compressed data through to the output
    pub fn flush_entry(&mut self) -> Result<()> {
        match &mut self.state {
            State::Entry(entry) => entry.encoder.flush().map_err(Into::into),
            State::Idle(out) => out.flush().map_err(Into::into),
            State::Broken => Err(broken()),
        }
    }

    /// Finish current entry and write its data descriptor
    fn finish_current_entry(&mut self) -> Result<()> {
        let entry = match std::mem::replace(&mut self.state, State::Broken) {
            State::Entry(entry) => entry,
            State::Idle(out) => {
                self.state = State::Idle(out);
                return Ok(());
            }
            State::Broken => return Err(broken()),
        };

        let mut out = entry.encoder.finish()?;
        let crc = entry.crc.finalize();
        let compressed_size = zip32(out.written - entry.data_offset, "compressed entry size")?;
        let uncompressed_size = zip32(entry.uncompressed_size, "entry size")?;

        let mut descriptor = Vec::with_capacity(16);
        descriptor.extend_from_slice(&[0x50, 0x4b, 0x07, 0x08]);
        descriptor.extend_from_slice(&crc.to_le_bytes());
        descriptor.extend_from_slice(&compressed_size.to_le_bytes());
        descriptor.extend_from_slice(&uncompressed_size.to_le_bytes());
        out.write_all(&descriptor)?;

        self.entries.push(ZipEntry {
            name: entry.name,
            local_header_offset: entry.local_header_offset,
            crc32: crc,
            compressed_size,
            uncompressed_size,
        });
        self.state = State::Idle(out);
        Ok(())
    }

    /// Write the central directory and hand back the output
    pub fn finish(mut self) -> Result<W> {
        self.finish_current_entry()?;

        let mut out = match std::mem::replace(&mut self.state, State::Broken) {
            State::Idle(out) => out,
            _ => return Err(broken()),
        };

        let entry_count = u16::try_from(self.entries.len())
            .map_err(|_| ExportError::Serialization("too many ZIP entries".to_string()))?;
        let central_dir_offset = zip32(out.written, "central directory offset")?;

        let mut dir = Vec::with_capacity(self.entries.len() * 80 + 22);
        for entry in &self.entries {
            dir.extend_from_slice(&[0x50, 0x4b, 0x01, 0x02]);
            dir.extend_from_slice(&VERSION.to_le_bytes()); // made by
            dir.extend_from_slice(&VERSION.to_le_bytes()); // needed
            dir.extend_from_slice(&(FLAG_DATA_DESCRIPTOR | FLAG_UTF8).to_le_bytes());
            dir.extend_from_slice(&METHOD_DEFLATE.to_le_bytes());
            dir.extend_from_slice(&DOS_TIME.to_le_bytes());
            dir.extend_from_slice(&DOS_DATE.to_le_bytes());
            dir.extend_from_slice(&entry.crc32.to_le_bytes());
            dir.extend_from_slice(&entry.compressed_size.to_le_bytes());
            dir.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
            dir.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            dir.extend_from_slice(&0u16.to_le_bytes()); // extra len
            dir.extend_from_slice(&0u16.to_le_bytes()); // comment len
            dir.extend_from_slice(&0u16.to_le_bytes()); // disk number start
            dir.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            dir.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            dir.extend_from_slice(&entry.local_header_offset.to_le_bytes());
            dir.extend_from_slice(entry.name.as_bytes());
        }
        let central_dir_size = zip32(dir.len() as u64, "central directory size")?;

        dir.extend_from_slice(&[0x50, 0x4b, 0x05, 0x06]);
        dir.extend_from_slice(&0u16.to_le_bytes()); // disk number
        dir.extend_from_slice(&0u16.to_le_bytes()); // disk with central dir
        dir.extend_from_slice(&entry_count.to_le_bytes());
        dir.extend_from_slice(&entry_count.to_le_bytes());
        dir.extend_from_slice(&central_dir_size.to_le_bytes());
        dir.extend_from_slice(&central_dir_offset.to_le_bytes());
        dir.extend_from_slice(&0u16.to_le_bytes()); // comment len

        out.write_all(&dir)?;
        out.flush()?;
        Ok(out.inner)
    }
}

impl<W: Write> Write for StreamingZipWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_data(buf)
            .map(|()| buf.len())
            .map_err(|err| io::Error::other(err.to_string()))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_entry()
            .map_err(|err| io::Error::other(err.to_string()))
    }
}

fn zip32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        ExportError::Serialization(format!("{} exceeds the 4 GiB ZIP32 limit", what))
    })
}

fn broken() -> ExportError {
    ExportError::Serialization("ZIP container is unusable after an earlier failure".to_string())
}
