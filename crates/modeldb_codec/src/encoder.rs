//! Order-preserving key encoder.

use crate::value::Value;

/// Escape marker following a zero content byte.
pub(crate) const ESCAPED_ZERO: u8 = 0xFF;
/// Marker following the zero byte that terminates text and byte strings.
pub(crate) const TERMINATOR: u8 = 0x00;

const SIGN_BIT: u64 = 1 << 63;

/// Encode a single value.
///
/// The encoding is self-delimiting and order-preserving: for any values
/// `a` and `b`, `encode_value(a).cmp(&encode_value(b)) == a.cmp(b)`, and no
/// encoding is a proper prefix of another.
#[must_use]
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut encoder = KeyEncoder::new();
    encoder.encode(value);
    encoder.into_bytes()
}

/// Encode a tuple of values as the concatenation of their encodings.
///
/// Tuples compare lexicographically by component.
#[must_use]
pub fn encode_tuple(values: &[Value]) -> Vec<u8> {
    let mut encoder = KeyEncoder::with_capacity(values.len() * 10);
    for value in values {
        encoder.encode(value);
    }
    encoder.into_bytes()
}

/// An order-preserving key encoder.
///
/// Appends encoded values to an internal buffer, optionally behind a raw
/// prefix written with [`KeyEncoder::raw`].
#[derive(Debug, Default)]
pub struct KeyEncoder {
    buffer: Vec<u8>,
}

impl KeyEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Append raw bytes without encoding.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    /// Encode a value.
    pub fn encode(&mut self, value: &Value) -> &mut Self {
        self.buffer.push(value.tag());
        match value {
            Value::Null => {}
            Value::Bool(b) => self.buffer.push(u8::from(*b)),
            Value::Integer(n) => self.encode_integer(*n),
            Value::Enum { ordinal, name } => {
                self.buffer.extend_from_slice(&ordinal.to_be_bytes());
                self.encode_escaped(name.as_bytes());
            }
            Value::Text(s) => self.encode_escaped(s.as_bytes()),
            Value::Bytes(b) => self.encode_escaped(b),
            Value::Reference(id) => self.buffer.extend_from_slice(id),
        }
        self
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_integer(&mut self, n: i64) {
        // Flipping the sign bit makes two's complement sort as unsigned.
        let biased = (n as u64) ^ SIGN_BIT;
        self.buffer.extend_from_slice(&biased.to_be_bytes());
    }

    fn encode_escaped(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.buffer.push(byte);
            if byte == 0 {
                self.buffer.push(ESCAPED_ZERO);
            }
        }
        self.buffer.push(0);
        self.buffer.push(TERMINATOR);
    }
}
