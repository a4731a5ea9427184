//! Minimal bencode decoder used for descriptor parsing.

use crate::error::{TorrentError, TorrentResult};

const MAX_DEPTH: usize = 64;

/// Decoded bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(Vec<(Vec<u8>, Value)>),
}

impl Value {
    pub(crate) fn get(&self, key: &[u8]) -> Option<&Self> {
        match self {
            Self::Dict(entries) => entries
                .iter()
                .find(|(candidate, _)| candidate.as_slice() == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub(crate) const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub(crate) fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Decode one value starting at `pos`, returning it with the offset just past it.
pub(crate) fn parse_value(data: &[u8], pos: usize) -> TorrentResult<(Value, usize)> {
    parse_nested(data, pos, 0)
}

fn parse_nested(data: &[u8], pos: usize, depth: usize) -> TorrentResult<(Value, usize)> {
    if depth > MAX_DEPTH {
        return Err(TorrentError::descriptor_at("nesting too deep", pos));
    }
    let Some(&prefix) = data.get(pos) else {
        return Err(TorrentError::descriptor_at("unexpected end of input", pos));
    };
    match prefix {
        b'i' => {
            let (value, next) = parse_int(data, pos)?;
            Ok((Value::Int(value), next))
        }
        b'l' => {
            let mut items = Vec::new();
            let mut cursor = pos + 1;
            while data.get(cursor).is_some_and(|byte| *byte != b'e') {
                let (value, next) = parse_nested(data, cursor, depth + 1)?;
                items.push(value);
                cursor = next;
            }
            if cursor >= data.len() {
                return Err(TorrentError::descriptor_at("unterminated list", pos));
            }
            Ok((Value::List(items), cursor + 1))
        }
        b'd' => {
            let mut entries = Vec::new();
            let mut cursor = pos + 1;
            while data.get(cursor).is_some_and(|byte| *byte != b'e') {
                let (key, next) = parse_bytes(data, cursor)?;
                let (value, next) = parse_nested(data, next, depth + 1)?;
                entries.push((key, value));
                cursor = next;
            }
            if cursor >= data.len() {
                return Err(TorrentError::descriptor_at("unterminated dictionary", pos));
            }
            Ok((Value::Dict(entries), cursor + 1))
        }
        b'0'..=b'9' => {
            let (bytes, next) = parse_bytes(data, pos)?;
            Ok((Value::Bytes(bytes), next))
        }
        _ => Err(TorrentError::descriptor_at("invalid value prefix", pos)),
    }
}

fn parse_int(data: &[u8], pos: usize) -> TorrentResult<(i64, usize)> {
    let start = pos + 1;
    let end = data[start..]
        .iter()
        .position(|byte| *byte == b'e')
        .map(|offset| start + offset)
        .ok_or_else(|| TorrentError::descriptor_at("unterminated integer", pos))?;
    let digits = &data[start..end];
    let leading_zero = digits.len() > 1 && digits[0] == b'0';
    let negative_zero = digits.starts_with(b"-0");
    if digits.is_empty() || leading_zero || negative_zero {
        return Err(TorrentError::descriptor_at("invalid integer", pos));
    }
    let value = std::str::from_utf8(digits)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| TorrentError::descriptor_at("invalid integer", pos))?;
    Ok((value, end + 1))
}

fn parse_bytes(data: &[u8], pos: usize) -> TorrentResult<(Vec<u8>, usize)> {
    let colon = data[pos..]
        .iter()
        .position(|byte| !byte.is_ascii_digit())
        .map(|offset| pos + offset)
        .filter(|index| *index > pos && data.get(*index) == Some(&b':'))
        .ok_or_else(|| TorrentError::descriptor_at("invalid string length", pos))?;
    let digits = &data[pos..colon];
    if digits.len() > 1 && digits[0] == b'0' {
        return Err(TorrentError::descriptor_at("invalid string length", pos));
    }
    let len = std::str::from_utf8(digits)
        .ok()
        .and_then(|text| text.parse::<usize>().ok())
        .ok_or_else(|| TorrentError::descriptor_at("invalid string length", pos))?;
    let start = colon + 1;
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| TorrentError::descriptor_at("unexpected end of input", start))?;
    Ok((data[start..end].to_vec(), end))
}
