//! Advertisement frame decoding
//!
//! A BLE advertisement record is a run of length-prefixed AD structures:
//!
//! ```text
//! [len][type][data ...] [len][type][data ...] ... [00][padding ...]
//!  ^---- len bytes ---^
//! ```
//!
//! Scan records from most radios are zero-padded to a fixed size, so the
//! walk stops at the first zero length byte. Everything before that byte is
//! the *valid prefix*; the terminator and any padding are discarded.

use crate::domain::error::DecodeError;
use crate::domain::manufacturers;

/// AD type for manufacturer-specific data
pub const AD_TYPE_MANUFACTURER_SPECIFIC: u8 = 0xFF;

/// One length-prefixed element of an advertisement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdStructure<'a> {
    /// Declared length (type byte + data)
    pub length: u8,
    pub ad_type: u8,
    pub data: &'a [u8],
}

impl AdStructure<'_> {
    /// Bytes this structure occupies on the wire, length byte included.
    pub fn encoded_len(&self) -> usize {
        self.length as usize + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    pub structures: Vec<AdStructure<'a>>,
    /// Bytes covered by `structures`, in frame order
    pub valid: &'a [u8],
    /// Whether the walk ended on an explicit zero-length terminator
    pub terminated: bool,
}

impl<'a> DecodedFrame<'a> {
    /// Company identifier from the first manufacturer-specific structure.
    pub fn manufacturer_id(&self) -> Option<u16> {
        self.structures
            .iter()
            .find(|s| s.ad_type == AD_TYPE_MANUFACTURER_SPECIFIC && s.data.len() >= 2)
            .map(|s| u16::from_le_bytes([s.data[0], s.data[1]]))
    }

    pub fn manufacturer_name(&self) -> Option<&'static str> {
        self.manufacturer_id().and_then(manufacturers::name_for)
    }

    /// Canonical report representation of the valid prefix.
    pub fn to_hex(&self) -> String {
        format_hex(self.valid)
    }
}

/// Outcome of a single TLV walk.
struct Walk<'a> {
    structures: Vec<AdStructure<'a>>,
    consumed: usize,
    terminated: bool,
    error: Option<DecodeError>,
}

fn walk(frame: &[u8]) -> Walk<'_> {
    let mut structures = Vec::new();
    let mut cursor = 0;

    while cursor < frame.len() {
        let length = frame[cursor];
        if length == 0 {
            return Walk {
                structures,
                consumed: cursor,
                terminated: true,
                error: None,
            };
        }

        let end = cursor + 1 + length as usize;
        if end > frame.len() {
            return Walk {
                structures,
                consumed: cursor,
                terminated: false,
                error: Some(DecodeError::Truncated {
                    offset: cursor,
                    declared: length,
                    available: frame.len() - cursor - 1,
                }),
            };
        }

        structures.push(AdStructure {
            length,
            ad_type: frame[cursor + 1],
            data: &frame[cursor + 2..end],
        });
        cursor = end;
    }

    Walk {
        structures,
        consumed: cursor,
        terminated: false,
        error: None,
    }
}

/// Decode an advertisement record into its AD structures.
///
/// Fails if a structure declares more bytes than the frame holds; use
/// [`valid_prefix`] to still recover the well-formed leading part.
pub fn decode(frame: &[u8]) -> Result<DecodedFrame<'_>, DecodeError> {
    let walk = walk(frame);
    if let Some(err) = walk.error {
        return Err(err);
    }
    Ok(DecodedFrame {
        structures: walk.structures,
        valid: &frame[..walk.consumed],
        terminated: walk.terminated,
    })
}

/// The structurally valid leading bytes of `frame`. Never fails: for a
/// malformed frame this is everything before the offending structure.
pub fn valid_prefix(frame: &[u8]) -> &[u8] {
    &frame[..walk(frame).consumed]
}

/// `0x` followed by uppercase hex, two characters per byte.
pub fn format_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode_upper(bytes))
}

/// Truncated hex of a raw frame, the form compared and uploaded.
pub fn truncated_hex(frame: &[u8]) -> String {
    format_hex(valid_prefix(frame))
}
