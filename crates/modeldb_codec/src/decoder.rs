//! Order-preserving key decoder.

use crate::encoder::{ESCAPED_ZERO, TERMINATOR};
use crate::error::{CodecError, CodecResult};
use crate::value::{tags, Value};

const SIGN_BIT: u64 = 1 << 63;

/// Decode exactly one value.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid encoding or if bytes
/// remain after the value.
pub fn decode_value(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = KeyDecoder::new(bytes);
    let value = decoder.decode()?;
    decoder.finish()?;
    Ok(value)
}

/// Decode a tuple, consuming all input.
///
/// # Errors
///
/// Returns an error if the bytes are not a sequence of valid encodings.
pub fn decode_tuple(bytes: &[u8]) -> CodecResult<Vec<Value>> {
    let mut decoder = KeyDecoder::new(bytes);
    let mut values = Vec::new();
    while !decoder.is_empty() {
        values.push(decoder.decode()?);
    }
    Ok(values)
}

/// Decode the first `count` values, returning them and the number of bytes
/// they occupy.
///
/// # Errors
///
/// Returns an error if fewer than `count` valid values are present.
pub fn decode_prefix(bytes: &[u8], count: usize) -> CodecResult<(Vec<Value>, usize)> {
    let mut decoder = KeyDecoder::new(bytes);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(decoder.decode()?);
    }
    Ok((values, decoder.position()))
}

/// An order-preserving key decoder.
///
/// Reads values one at a time from a borrowed buffer.
pub struct KeyDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> KeyDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> CodecResult<Value> {
        let offset = self.pos;
        let tag = self.read_byte()?;
        match tag {
            tags::NULL => Ok(Value::Null),
            tags::BOOL => match self.read_byte()? {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                _ => Err(CodecError::invalid_tag(tag, offset)),
            },
            tags::INTEGER => {
                let raw = self.read_array::<8>()?;
                #[allow(clippy::cast_possible_wrap)]
                let n = (u64::from_be_bytes(raw) ^ SIGN_BIT) as i64;
                Ok(Value::Integer(n))
            }
            tags::ENUM => {
                let ordinal = u32::from_be_bytes(self.read_array::<4>()?);
                let name = self.read_text()?;
                Ok(Value::Enum { ordinal, name })
            }
            tags::TEXT => self.read_text().map(Value::Text),
            tags::BYTES => self.read_escaped().map(Value::Bytes),
            tags::REFERENCE => self.read_array::<16>().map(Value::Reference),
            other => Err(CodecError::invalid_tag(other, offset)),
        }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Fails if any input is left.
    pub fn finish(&self) -> CodecResult<()> {
        match self.remaining().len() {
            0 => Ok(()),
            count => Err(CodecError::trailing_bytes(count)),
        }
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let end = self.pos + N;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(CodecError::UnexpectedEof)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }

    fn read_text(&mut self) -> CodecResult<String> {
        String::from_utf8(self.read_escaped()?).map_err(|_| CodecError::InvalidUtf8)
    }

    fn read_escaped(&mut self) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let byte = self.read_byte()?;
            if byte != 0 {
                out.push(byte);
                continue;
            }
            let offset = self.pos - 1;
            match self.read_byte()? {
                ESCAPED_ZERO => out.push(0),
                TERMINATOR => return Ok(out),
                _ => return Err(CodecError::invalid_escape(offset)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode_tuple, encode_value};

    #[test]
    fn decode_integer_extremes() {
        for n in [i64::MIN, -1, 0, 1, i64::MAX] {
            assert_eq!(decode_value(&encode_value(&Value::Integer(n))).unwrap(), Value::Integer(n));
        }
    }

    #[test]
    fn decode_text_with_zero() {
        let value = Value::text("a\0\0b");
        assert_eq!(decode_value(&encode_value(&value)).unwrap(), value);
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        assert_eq!(
            decode_value(&[0x99]),
            Err(CodecError::InvalidTag { tag: 0x99, offset: 0 })
        );
    }

    #[test]
    fn decode_rejects_truncated_input() {
        assert_eq!(decode_value(&[0x03, 0x80]), Err(CodecError::UnexpectedEof));
        assert_eq!(decode_value(&[0x05, b'a']), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn decode_rejects_bad_escape() {
        assert_eq!(
            decode_value(&[0x05, b'a', 0x00, 0x07]),
            Err(CodecError::InvalidEscape { offset: 2 })
        );
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert_eq!(
            decode_value(&[0x05, 0xC3, 0x00, 0x00]),
            Err(CodecError::InvalidUtf8)
        );
    }

    #[test]
    fn decode_value_rejects_trailing() {
        let mut bytes = encode_value(&Value::Null);
        bytes.push(0x01);
        assert_eq!(decode_value(&bytes), Err(CodecError::TrailingBytes { count: 1 }));
    }

    #[test]
    fn decode_prefix_reports_length() {
        let tuple = [Value::Integer(1), Value::text("x"), Value::Bool(true)];
        let bytes = encode_tuple(&tuple);
        let (head, used) = decode_prefix(&bytes, 2).unwrap();
        assert_eq!(head, tuple[..2].to_vec());
        assert_eq!(&bytes[..used], encode_tuple(&tuple[..2]).as_slice());
        assert_eq!(decode_tuple(&bytes[used..]).unwrap(), vec![Value::Bool(true)]);
    }
}
