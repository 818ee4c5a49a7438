//! Layered byte-stream readers.
//!
//! Every archive is pulled through a [`StreamReader`]: a closed set of
//! reader variants over the possible byte sources (memory map, buffered
//! file, caller-supplied memory) plus decompressing decorators. A decorator
//! owns its inner reader and closes it when it is closed itself.
//!
//! [`StreamReader::close`] is idempotent; dropping a reader releases the
//! same resources, so every exit path gives up the underlying source exactly
//! once.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;
use memmap2::Mmap;
use zstd::stream::read::Decoder as ZstdDecoder;

use crate::error::{ArchiveError, Result};

/// Gzip magic: `0x1f 0x8b`, third byte is the DEFLATE method marker.
pub const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];
/// Zstandard frame magic.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// A pull-based byte source with seek, layered via decoration.
pub enum StreamReader {
    FileBacked(FileStream),
    MemoryMapped(MmapStream),
    InMemory(MemoryStream),
    GzipDecorated(GzipStream),
    ZstdDecorated(ZstdStream),
}

impl std::fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            StreamReader::FileBacked(_) => "FileBacked",
            StreamReader::MemoryMapped(_) => "MemoryMapped",
            StreamReader::InMemory(_) => "InMemory",
            StreamReader::GzipDecorated(_) => "GzipDecorated",
            StreamReader::ZstdDecorated(_) => "ZstdDecorated",
        };
        f.debug_struct("StreamReader").field("variant", &variant).finish()
    }
}

pub struct FileStream {
    inner: Option<BufReader<File>>,
}

pub struct MmapStream {
    map: Option<Mmap>,
    offset: u64,
}

pub struct MemoryStream {
    data: Option<Arc<[u8]>>,
    offset: u64,
}

pub struct GzipStream {
    inner: Option<GzDecoder<Box<StreamReader>>>,
    offset: u64,
}

pub struct ZstdStream {
    inner: Option<ZstdDecoder<'static, BufReader<Box<StreamReader>>>>,
    offset: u64,
}

impl StreamReader {
    /// Open the most efficient raw source for `path`: a memory map when the
    /// file supports it, buffered reads otherwise. The descriptor itself is
    /// not kept once a mapping exists.
    #[allow(unsafe_code)] // memmap2 mapping is unsafe by API contract
    pub fn open_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| ArchiveError::OpenFailure {
            path: path.to_path_buf(),
            source,
        })?;
        // Mapping fails for empty files and special files; fall back to
        // buffered file I/O in that case.
        match unsafe { Mmap::map(&file) } {
            Ok(map) => Ok(Self::MemoryMapped(MmapStream {
                map: Some(map),
                offset: 0,
            })),
            Err(_) => Ok(Self::FileBacked(FileStream {
                inner: Some(BufReader::new(file)),
            })),
        }
    }

    /// Wrap a caller-supplied memory region.
    pub fn from_memory(data: impl Into<Arc<[u8]>>) -> Self {
        Self::InMemory(MemoryStream {
            data: Some(data.into()),
            offset: 0,
        })
    }

    fn gzip(inner: Self) -> Self {
        Self::GzipDecorated(GzipStream {
            inner: Some(GzDecoder::new(Box::new(inner))),
            offset: 0,
        })
    }

    fn zstd(inner: Self) -> Result<Self> {
        let decoder = ZstdDecoder::new(Box::new(inner))?;
        Ok(Self::ZstdDecorated(ZstdStream {
            inner: Some(decoder),
            offset: 0,
        }))
    }

    /// Sniff the first bytes of `raw` and, when they carry a known
    /// compression magic, wrap it in the matching decompressing reader. The
    /// decorator takes ownership of `raw` and will close it.
    ///
    /// The raw stream is always rewound to offset 0 before being handed
    /// onward. A source shorter than the minimum viable archive is closed
    /// and rejected here, before any header parsing is attempted.
    pub fn wrap_uncompressed(mut raw: Self) -> Result<Self> {
        let mut head = [0u8; crate::header::LEGACY_HEADER_LEN];
        let mut filled = 0;
        while filled < head.len() {
            let n = raw.read(&mut head[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled < head.len() {
            raw.close();
            return Err(ArchiveError::TooShort);
        }
        raw.seek(SeekFrom::Start(0))?;

        if head[..3] == GZIP_MAGIC {
            return Ok(Self::gzip(raw));
        }
        if head[..4] == ZSTD_MAGIC {
            return Self::zstd(raw);
        }
        Ok(raw)
    }

    /// Release the underlying resource. Closing twice is a no-op; a
    /// decorator closes its inner reader as part of its own close.
    pub fn close(&mut self) {
        match self {
            Self::FileBacked(s) => {
                s.inner = None;
            }
            Self::MemoryMapped(s) => {
                s.map = None;
            }
            Self::InMemory(s) => {
                s.data = None;
            }
            Self::GzipDecorated(s) => {
                if let Some(decoder) = s.inner.take() {
                    let mut inner = decoder.into_inner();
                    inner.close();
                }
            }
            Self::ZstdDecorated(s) => {
                if let Some(decoder) = s.inner.take() {
                    let mut inner = decoder.finish().into_inner();
                    inner.close();
                }
            }
        }
    }

    /// True when the reader still holds its resource.
    pub fn is_open(&self) -> bool {
        match self {
            Self::FileBacked(s) => s.inner.is_some(),
            Self::MemoryMapped(s) => s.map.is_some(),
            Self::InMemory(s) => s.data.is_some(),
            Self::GzipDecorated(s) => s.inner.is_some(),
            Self::ZstdDecorated(s) => s.inner.is_some(),
        }
    }
}

fn read_from_slice(data: &[u8], offset: &mut u64, buf: &mut [u8]) -> io::Result<usize> {
    let start = (*offset).min(data.len() as u64) as usize;
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    *offset += n as u64;
    Ok(n)
}

fn seek_in_slice(len: u64, offset: &mut u64, pos: SeekFrom) -> io::Result<u64> {
    let target = match pos {
        SeekFrom::Start(n) => i64::try_from(n)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek offset overflow"))?,
        SeekFrom::Current(d) => *offset as i64 + d,
        SeekFrom::End(d) => len as i64 + d,
    };
    if target < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "seek before start of stream",
        ));
    }
    *offset = (target as u64).min(len);
    Ok(*offset)
}

/// Forward-only seek for decompressing readers: decode and discard up to
/// the target offset.
fn skip_forward(reader: &mut impl Read, offset: &mut u64, pos: SeekFrom) -> io::Result<u64> {
    let unsupported = || {
        io::Error::new(
            io::ErrorKind::Unsupported,
            "cannot seek backward in a compressed stream",
        )
    };
    let target = match pos {
        SeekFrom::Start(n) => n,
        SeekFrom::Current(d) if d >= 0 => *offset + d as u64,
        _ => return Err(unsupported()),
    };
    if target < *offset {
        return Err(unsupported());
    }
    let mut scratch = [0u8; 8192];
    while *offset < target {
        let want = ((target - *offset).min(scratch.len() as u64)) as usize;
        let n = reader.read(&mut scratch[..want])?;
        if n == 0 {
            break;
        }
        *offset += n as u64;
    }
    Ok(*offset)
}

impl Read for StreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::FileBacked(s) => match s.inner.as_mut() {
                Some(reader) => reader.read(buf),
                None => Ok(0),
            },
            Self::MemoryMapped(s) => match s.map.as_ref() {
                Some(map) => read_from_slice(map, &mut s.offset, buf),
                None => Ok(0),
            },
            Self::InMemory(s) => match s.data.as_ref() {
                Some(data) => read_from_slice(data, &mut s.offset, buf),
                None => Ok(0),
            },
            Self::GzipDecorated(s) => match s.inner.as_mut() {
                Some(decoder) => {
                    let n = decoder.read(buf)?;
                    s.offset += n as u64;
                    Ok(n)
                }
                None => Ok(0),
            },
            Self::ZstdDecorated(s) => match s.inner.as_mut() {
                Some(decoder) => {
                    let n = decoder.read(buf)?;
                    s.offset += n as u64;
                    Ok(n)
                }
                None => Ok(0),
            },
        }
    }
}

impl Seek for StreamReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::FileBacked(s) => match s.inner.as_mut() {
                Some(reader) => reader.seek(pos),
                None => Ok(0),
            },
            Self::MemoryMapped(s) => {
                let len = s.map.as_ref().map_or(0, |map| map.len() as u64);
                seek_in_slice(len, &mut s.offset, pos)
            }
            Self::InMemory(s) => {
                let len = s.data.as_ref().map_or(0, |data| data.len() as u64);
                seek_in_slice(len, &mut s.offset, pos)
            }
            Self::GzipDecorated(s) => match s.inner.as_mut() {
                Some(decoder) => {
                    let mut offset = s.offset;
                    let result = skip_forward(decoder, &mut offset, pos);
                    s.offset = offset;
                    result
                }
                None => Ok(0),
            },
            Self::ZstdDecorated(s) => match s.inner.as_mut() {
                Some(decoder) => {
                    let mut offset = s.offset;
                    let result = skip_forward(decoder, &mut offset, pos);
                    s.offset = offset;
                    result
                }
                None => Ok(0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn gzip_bytes(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_memory_read_and_seek() {
        let mut reader = StreamReader::from_memory(&b"abcdefgh"[..]);
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abcd");

        reader.seek(SeekFrom::Start(2)).unwrap();
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cdef");

        assert_eq!(reader.seek(SeekFrom::End(-2)).unwrap(), 6);
    }

    #[test]
    fn test_close_is_idempotent() {
        let data: Arc<[u8]> = Arc::from(&b"0123456789ab"[..]);
        let mut reader = StreamReader::from_memory(Arc::clone(&data));
        assert_eq!(Arc::strong_count(&data), 2);

        reader.close();
        assert_eq!(Arc::strong_count(&data), 1);
        reader.close();
        assert_eq!(Arc::strong_count(&data), 1);
        assert!(!reader.is_open());
    }

    #[test]
    fn test_decorator_close_releases_inner_once() {
        let payload = gzip_bytes(b"decorated payload");
        let data: Arc<[u8]> = Arc::from(payload.as_slice());
        let raw = StreamReader::from_memory(Arc::clone(&data));

        let mut chain = StreamReader::wrap_uncompressed(raw).unwrap();
        assert_eq!(Arc::strong_count(&data), 2);

        chain.close();
        assert_eq!(Arc::strong_count(&data), 1);
        chain.close();
        assert_eq!(Arc::strong_count(&data), 1);
    }

    #[test]
    fn test_sniff_gzip() {
        let compressed = gzip_bytes(b"hello scene archive payload");
        let raw = StreamReader::from_memory(compressed);
        let mut reader = StreamReader::wrap_uncompressed(raw).unwrap();
        assert!(matches!(reader, StreamReader::GzipDecorated(_)));

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello scene archive payload");
    }

    #[test]
    fn test_sniff_zstd() {
        let compressed = zstd::encode_all(&b"zstd wrapped payload"[..], 0).unwrap();
        let raw = StreamReader::from_memory(compressed);
        let mut reader = StreamReader::wrap_uncompressed(raw).unwrap();
        assert!(matches!(reader, StreamReader::ZstdDecorated(_)));

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"zstd wrapped payload");
    }

    #[test]
    fn test_sniff_passes_plain_data_through() {
        let raw = StreamReader::from_memory(&b"SCARCHV-v400"[..]);
        let mut reader = StreamReader::wrap_uncompressed(raw).unwrap();
        assert!(matches!(reader, StreamReader::InMemory(_)));

        let mut head = [0u8; 6];
        reader.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"SCARCH");
    }

    #[test]
    fn test_sniff_rejects_too_short_source() {
        let raw = StreamReader::from_memory(&b"xy"[..]);
        let err = StreamReader::wrap_uncompressed(raw).unwrap_err();
        assert!(matches!(err, ArchiveError::TooShort));
    }

    #[test]
    fn test_decorated_forward_seek_only() {
        let compressed = gzip_bytes(b"0123456789");
        let raw = StreamReader::from_memory(compressed);
        let mut reader = StreamReader::wrap_uncompressed(raw).unwrap();

        reader.seek(SeekFrom::Start(4)).unwrap();
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"45");

        let err = reader.seek(SeekFrom::Start(0)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_open_path_prefers_mmap() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"file backed archive bytes").unwrap();
        file.flush().unwrap();

        let mut reader = StreamReader::open_path(file.path()).unwrap();
        assert!(matches!(reader, StreamReader::MemoryMapped(_)));

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"file backed archive bytes");
    }

    #[test]
    fn test_open_path_missing_file() {
        let err = StreamReader::open_path(Path::new("/nonexistent/archive.scar")).unwrap_err();
        assert!(matches!(err, ArchiveError::OpenFailure { .. }));
    }
}
