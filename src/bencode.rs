//! Minimal bencode decoder.
//!
//! Decodes the bencode format used by `.torrent` metadata files into a generic value tree.
//! Only decoding is supported since the metadata is only read for the torrent name.

use thiserror::Error;

/// Maximum nesting depth for lists and dictionaries.
const MAX_DEPTH: usize = 64;

/// A decoded bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BencodeValue {
    /// Raw bytes, which may or may not be valid UTF-8.
    ByteString(Vec<u8>),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Ordered list of values.
    List(Vec<Self>),
    /// Dictionary with raw byte string keys in insertion order.
    Dict(Vec<(Vec<u8>, Self)>),
}

/// Errors from decoding malformed bencode data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BencodeError {
    #[error("malformed integer at byte {position}")]
    MalformedInteger { position: usize },

    #[error("malformed string length at byte {position}")]
    MalformedLength { position: usize },

    #[error("unterminated list starting at byte {position}")]
    UnterminatedList { position: usize },

    #[error("unterminated dictionary starting at byte {position}")]
    UnterminatedDict { position: usize },

    #[error("unknown type tag {tag:#04x} at byte {position}")]
    UnknownTag { tag: u8, position: usize },

    #[error("dictionary key at byte {position} is not a byte string")]
    NonStringKey { position: usize },

    #[error("unexpected end of data at byte {position}")]
    UnexpectedEnd { position: usize },

    #[error("nesting too deep at byte {position}")]
    NestingTooDeep { position: usize },
}

impl BencodeValue {
    /// Look up a dictionary value by key.
    ///
    /// Returns `None` if this is not a dictionary or the key is missing.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&Self> {
        match self {
            Self::Dict(entries) => entries
                .iter()
                .find(|(entry_key, _)| entry_key.as_slice() == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Returns the raw bytes if this is a byte string.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::ByteString(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the value if this is an integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the items if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the byte string decoded as UTF-8 with invalid sequences replaced.
    #[must_use]
    pub fn to_string_lossy(&self) -> Option<String> {
        self.as_bytes()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Decode the value starting at `start`.
///
/// Returns the decoded value and the index of the first byte after it.
///
/// # Errors
/// Returns an error if the data at `start` is not well-formed bencode.
pub fn decode(buffer: &[u8], start: usize) -> Result<(BencodeValue, usize), BencodeError> {
    let mut position = start;
    let value = decode_value(buffer, &mut position, 0)?;
    Ok((value, position))
}

/// Decode the root value of a buffer.
///
/// Any bytes following the root value are ignored.
///
/// # Errors
/// Returns an error if the root value is not well-formed bencode.
pub fn decode_root(buffer: &[u8]) -> Result<BencodeValue, BencodeError> {
    decode(buffer, 0).map(|(value, _)| value)
}

fn decode_value(buffer: &[u8], position: &mut usize, depth: usize) -> Result<BencodeValue, BencodeError> {
    let Some(&tag) = buffer.get(*position) else {
        return Err(BencodeError::UnexpectedEnd { position: *position });
    };

    match tag {
        b'i' => decode_integer(buffer, position),
        b'l' => decode_list(buffer, position, depth),
        b'd' => decode_dict(buffer, position, depth),
        b'0'..=b'9' => decode_byte_string(buffer, position).map(BencodeValue::ByteString),
        _ => Err(BencodeError::UnknownTag {
            tag,
            position: *position,
        }),
    }
}

fn decode_integer(buffer: &[u8], position: &mut usize) -> Result<BencodeValue, BencodeError> {
    let start = *position;
    let digits_start = start + 1;
    let error = BencodeError::MalformedInteger { position: start };

    let end = buffer[digits_start..]
        .iter()
        .position(|&byte| byte == b'e')
        .map(|offset| digits_start + offset)
        .ok_or_else(|| error.clone())?;

    let value = std::str::from_utf8(&buffer[digits_start..end])
        .ok()
        .and_then(|digits| digits.parse::<i64>().ok())
        .ok_or(error)?;

    *position = end + 1;
    Ok(BencodeValue::Integer(value))
}

fn decode_byte_string(buffer: &[u8], position: &mut usize) -> Result<Vec<u8>, BencodeError> {
    let start = *position;
    let error = BencodeError::MalformedLength { position: start };

    let colon = buffer[start..]
        .iter()
        .position(|&byte| byte == b':')
        .map(|offset| start + offset)
        .ok_or_else(|| error.clone())?;

    let length = std::str::from_utf8(&buffer[start..colon])
        .ok()
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()))
        .and_then(|digits| digits.parse::<usize>().ok())
        .ok_or_else(|| error.clone())?;

    let data_start = colon + 1;
    if length > buffer.len() - data_start {
        return Err(error);
    }

    let data_end = data_start + length;
    *position = data_end;
    Ok(buffer[data_start..data_end].to_vec())
}

fn decode_list(buffer: &[u8], position: &mut usize, depth: usize) -> Result<BencodeValue, BencodeError> {
    let start = *position;
    if depth >= MAX_DEPTH {
        return Err(BencodeError::NestingTooDeep { position: start });
    }
    *position += 1;

    let mut items = Vec::new();
    loop {
        match buffer.get(*position) {
            None => return Err(BencodeError::UnterminatedList { position: start }),
            Some(b'e') => break,
            Some(_) => items.push(decode_value(buffer, position, depth + 1)?),
        }
    }

    *position += 1;
    Ok(BencodeValue::List(items))
}

fn decode_dict(buffer: &[u8], position: &mut usize, depth: usize) -> Result<BencodeValue, BencodeError> {
    let start = *position;
    if depth >= MAX_DEPTH {
        return Err(BencodeError::NestingTooDeep { position: start });
    }
    *position += 1;

    let mut entries: Vec<(Vec<u8>, BencodeValue)> = Vec::new();
    loop {
        match buffer.get(*position) {
            None => return Err(BencodeError::UnterminatedDict { position: start }),
            Some(b'e') => break,
            Some(b'0'..=b'9') => {
                let key = decode_byte_string(buffer, position)?;
                let value = decode_value(buffer, position, depth + 1).map_err(|error| match error {
                    BencodeError::UnexpectedEnd { .. } => BencodeError::UnterminatedDict { position: start },
                    other => other,
                })?;
                // Duplicate keys keep their first position with the last value
                if let Some(entry) = entries.iter_mut().find(|(existing, _)| *existing == key) {
                    entry.1 = value;
                } else {
                    entries.push((key, value));
                }
            }
            Some(_) => return Err(BencodeError::NonStringKey { position: *position }),
        }
    }

    *position += 1;
    Ok(BencodeValue::Dict(entries))
}
