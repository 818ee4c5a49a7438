//! Format header decoding.
//!
//! Every scene archive starts with a fixed preamble identifying the format,
//! the writing build's pointer width and endianness, and the file version.
//! Two encodings exist:
//!
//! | Layout | Offset | Length | Field                                   |
//! |--------|--------|--------|-----------------------------------------|
//! | both   | 0      | 6      | magic tag `SCARCH`                      |
//! | both   | 6      | 1      | reserved                                |
//! | legacy | 7      | 1      | pointer size: `_` = 4, `-` = 8          |
//! | legacy | 8      | 1      | endianness: `v` = little, `V` = big     |
//! | legacy | 9      | 3      | file version, 3 decimal digits          |
//! | modern | 7      | 2      | total header length, must be `17`       |
//! | modern | 9      | 1      | literal `-`                             |
//! | modern | 10     | 2      | file format version, only `01` known    |
//! | modern | 12     | 1      | literal `v` (little-endian only)        |
//! | modern | 13     | 4      | file version, 4 decimal digits          |
//!
//! A confirmed magic tag with an unparseable remainder is never classified
//! as "not this format": it decodes to [`HeaderVariant::Unknown`] so callers
//! can report a future/foreign version instead of an invalid file.

use std::io::Read;

/// The 6-byte format tag at the start of every archive.
pub const MAGIC: [u8; 6] = *b"SCARCH";
/// Reserved byte written after the tag; readers ignore it.
pub const RESERVED: u8 = b'V';
/// Total size of the legacy header, and the minimum viable file size.
pub const LEGACY_HEADER_LEN: usize = 12;
/// Total size of the modern header.
pub const MODERN_HEADER_LEN: usize = 17;

/// Pointer width of the build that wrote the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSize {
    Four,
    Eight,
}

impl PointerSize {
    pub fn in_bytes(self) -> usize {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    /// Pointer width of the running build.
    pub fn native() -> Self {
        if size_of::<usize>() == 4 {
            Self::Four
        } else {
            Self::Eight
        }
    }
}

/// Byte order of the build that wrote the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the running build.
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }
}

/// Decoded format header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub pointer_size: PointerSize,
    pub endianness: Endianness,
    pub file_version: u32,
    /// 0 for the legacy layout, 1 for the modern layout.
    pub file_format_version: u32,
}

impl FormatHeader {
    /// Encode in the modern 17-byte layout.
    ///
    /// The modern layout only defines 8-byte pointers and little-endian
    /// order; those fields of `self` are not consulted.
    pub fn encode_modern(&self) -> [u8; MODERN_HEADER_LEN] {
        let mut bytes = [0u8; MODERN_HEADER_LEN];
        bytes[..6].copy_from_slice(&MAGIC);
        bytes[6] = RESERVED;
        bytes[7..9].copy_from_slice(b"17");
        bytes[9] = b'-';
        bytes[10..12].copy_from_slice(b"01");
        bytes[12] = b'v';
        write_digits(&mut bytes[13..17], self.file_version);
        bytes
    }

    /// Encode in the legacy 12-byte layout.
    pub fn encode_legacy(&self) -> [u8; LEGACY_HEADER_LEN] {
        let mut bytes = [0u8; LEGACY_HEADER_LEN];
        bytes[..6].copy_from_slice(&MAGIC);
        bytes[6] = RESERVED;
        bytes[7] = match self.pointer_size {
            PointerSize::Four => b'_',
            PointerSize::Eight => b'-',
        };
        bytes[8] = match self.endianness {
            Endianness::Little => b'v',
            Endianness::Big => b'V',
        };
        write_digits(&mut bytes[9..12], self.file_version);
        bytes
    }
}

fn write_digits(out: &mut [u8], mut value: u32) {
    for slot in out.iter_mut().rev() {
        *slot = b'0' + (value % 10) as u8;
        value /= 10;
    }
}

/// Result of decoding the archive preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderVariant {
    /// Not this format at all.
    Invalid,
    /// The magic tag matched but the rest could not be decoded; likely a
    /// future version of the format.
    Unknown,
    /// Successfully decoded.
    Header(FormatHeader),
}

/// Decode the format header from the start of `reader`.
///
/// Reads the minimum (legacy) header length first and only pulls the
/// remaining modern bytes when the layout requires them.
pub fn decode_header<R: Read>(reader: &mut R) -> HeaderVariant {
    let mut bytes = [0u8; MODERN_HEADER_LEN];
    if read_fully(reader, &mut bytes[..LEGACY_HEADER_LEN]).is_err() {
        return HeaderVariant::Invalid;
    }
    if bytes[..6] != MAGIC {
        return HeaderVariant::Invalid;
    }
    // From here on the tag has matched: everything undecodable is a
    // potentially newer encoding, not a foreign file.

    if bytes[7] == b'_' || bytes[7] == b'-' {
        return decode_legacy(&bytes[..LEGACY_HEADER_LEN]);
    }
    decode_modern(reader, &mut bytes)
}

fn decode_legacy(bytes: &[u8]) -> HeaderVariant {
    let pointer_size = match bytes[7] {
        b'_' => PointerSize::Four,
        b'-' => PointerSize::Eight,
        _ => return HeaderVariant::Unknown,
    };
    let endianness = match bytes[8] {
        b'v' => Endianness::Little,
        b'V' => Endianness::Big,
        _ => return HeaderVariant::Unknown,
    };
    let Some(file_version) = parse_digits(&bytes[9..12]) else {
        return HeaderVariant::Unknown;
    };
    HeaderVariant::Header(FormatHeader {
        pointer_size,
        endianness,
        file_version,
        file_format_version: 0,
    })
}

fn decode_modern<R: Read>(reader: &mut R, bytes: &mut [u8; MODERN_HEADER_LEN]) -> HeaderVariant {
    let Some(header_len) = parse_digits(&bytes[7..9]) else {
        return HeaderVariant::Unknown;
    };
    if header_len as usize != MODERN_HEADER_LEN {
        return HeaderVariant::Unknown;
    }
    if read_fully(reader, &mut bytes[LEGACY_HEADER_LEN..]).is_err() {
        return HeaderVariant::Unknown;
    }
    if bytes[9] != b'-' {
        return HeaderVariant::Unknown;
    }
    let Some(file_format_version) = parse_digits(&bytes[10..12]) else {
        return HeaderVariant::Unknown;
    };
    if file_format_version != 1 {
        return HeaderVariant::Unknown;
    }
    if bytes[12] != b'v' {
        return HeaderVariant::Unknown;
    }
    let Some(file_version) = parse_digits(&bytes[13..17]) else {
        return HeaderVariant::Unknown;
    };
    HeaderVariant::Header(FormatHeader {
        pointer_size: PointerSize::Eight,
        endianness: Endianness::Little,
        file_version,
        file_format_version,
    })
}

fn parse_digits(bytes: &[u8]) -> Option<u32> {
    let mut value: u32 = 0;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u32::from(byte - b'0');
    }
    Some(value)
}

fn read_fully<R: Read>(reader: &mut R, mut buf: &mut [u8]) -> std::io::Result<()> {
    while !buf.is_empty() {
        let n = reader.read(buf)?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf = &mut std::mem::take(&mut buf)[n..];
    }
    Ok(())
}
