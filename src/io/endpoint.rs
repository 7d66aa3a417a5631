//! Byte endpoints the transcoder reads scenes from and writes scenes to.
//!
//! An endpoint is either a named file ([`FileEndpoint`]) or an in-memory byte
//! stream ([`MemoryEndpoint`]). The transcoder only depends on the two narrow
//! capabilities below, so both kinds behave identically apart from where the
//! bytes live.

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A source of encoded scene bytes.
pub trait ByteSource {
    /// Total length of the content, measured by seeking. The measurement does
    /// not depend on the current read position.
    fn content_len(&mut self) -> io::Result<u64>;

    /// Reads the whole content into one contiguous buffer. The read position is
    /// left at the end of the content.
    fn read_content(&mut self) -> io::Result<Vec<u8>>;
}

/// A destination for encoded scene bytes.
pub trait ByteSink {
    /// Returns `true` when the destination holds no bytes yet.
    fn is_empty(&mut self) -> io::Result<bool>;

    /// Writes the whole buffer in one operation.
    fn write_content(&mut self, data: &[u8]) -> io::Result<()>;
}

fn stream_len<S: Seek + ?Sized>(stream: &mut S) -> io::Result<u64> {
    let start = stream.seek(SeekFrom::Start(0))?;
    let end = stream.seek(SeekFrom::End(0))?;
    Ok(end - start)
}

fn read_stream<S: Read + Seek + ?Sized>(stream: &mut S) -> io::Result<Vec<u8>> {
    let size = stream_len(stream)?;
    let size = usize::try_from(size)
        .map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "stream does not fit in memory"))?;
    let mut buf = vec![0u8; size];
    stream.seek(SeekFrom::Start(0))?;
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_stream<S: Write + ?Sized>(stream: &mut S, data: &[u8]) -> io::Result<()> {
    stream.write_all(data)?;
    stream.flush()
}

/// A named file used as a source or a destination.
#[derive(Debug)]
pub struct FileEndpoint {
    file: File,
}

impl FileEndpoint {
    /// Opens an existing file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self { file: File::open(path)? })
    }

    /// Creates a file for writing, truncating any existing content.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self { file: File::create(path)? })
    }

    /// Opens a file for writing without truncating it, creating it when it
    /// does not exist. Writing a scene fails if the file already has content.
    pub fn open_for_write<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
        Ok(Self { file })
    }

    pub fn into_inner(self) -> File {
        self.file
    }
}

impl From<File> for FileEndpoint {
    fn from(file: File) -> Self {
        Self { file }
    }
}

impl ByteSource for FileEndpoint {
    fn content_len(&mut self) -> io::Result<u64> {
        stream_len(&mut self.file)
    }

    fn read_content(&mut self) -> io::Result<Vec<u8>> {
        read_stream(&mut self.file)
    }
}

impl ByteSink for FileEndpoint {
    fn is_empty(&mut self) -> io::Result<bool> {
        Ok(stream_len(&mut self.file)? == 0)
    }

    fn write_content(&mut self, data: &[u8]) -> io::Result<()> {
        write_stream(&mut self.file, data)
    }
}

/// An in-memory byte stream used as a source or a destination.
#[derive(Debug, Clone, Default)]
pub struct MemoryEndpoint {
    cursor: Cursor<Vec<u8>>,
}

impl MemoryEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

impl From<Vec<u8>> for MemoryEndpoint {
    fn from(bytes: Vec<u8>) -> Self {
        Self { cursor: Cursor::new(bytes) }
    }
}

impl From<&[u8]> for MemoryEndpoint {
    fn from(bytes: &[u8]) -> Self {
        Self::from(bytes.to_vec())
    }
}

impl ByteSource for MemoryEndpoint {
    fn content_len(&mut self) -> io::Result<u64> {
        stream_len(&mut self.cursor)
    }

    fn read_content(&mut self) -> io::Result<Vec<u8>> {
        read_stream(&mut self.cursor)
    }
}

impl ByteSink for MemoryEndpoint {
    fn is_empty(&mut self) -> io::Result<bool> {
        Ok(stream_len(&mut self.cursor)? == 0)
    }

    fn write_content(&mut self, data: &[u8]) -> io::Result<()> {
        write_stream(&mut self.cursor, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("draco_transcoder_endpoint_{}_{}", name, std::process::id()))
    }

    #[test]
    fn memory_read_ignores_current_position() {
        let mut source = MemoryEndpoint::from(vec![1u8, 2, 3, 4, 5]);
        source.cursor.set_position(3);
        assert_eq!(source.content_len().unwrap(), 5);
        assert_eq!(source.read_content().unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(source.position(), 5);
    }

    #[test]
    fn memory_sink_emptiness() {
        let mut sink = MemoryEndpoint::new();
        assert!(sink.is_empty().unwrap());
        sink.write_content(b"glTF").unwrap();
        assert!(!sink.is_empty().unwrap());
        assert_eq!(sink.as_bytes(), b"glTF");
    }

    #[test]
    fn file_endpoints() {
        let path = temp_path("roundtrip");
        {
            let mut sink = FileEndpoint::create(&path).unwrap();
            assert!(sink.is_empty().unwrap());
            sink.write_content(b"some bytes").unwrap();
        }
        {
            let mut sink = FileEndpoint::open_for_write(&path).unwrap();
            assert!(!sink.is_empty().unwrap());
        }
        let mut source = FileEndpoint::open(&path).unwrap();
        assert_eq!(source.content_len().unwrap(), 10);
        assert_eq!(source.read_content().unwrap(), b"some bytes".to_vec());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_source_reads_nothing() {
        let mut source = MemoryEndpoint::new();
        assert_eq!(source.read_content().unwrap(), Vec::<u8>::new());
    }
}
