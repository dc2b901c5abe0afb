//! Dynamic storage value type.

use std::fmt;

/// A dynamic storage value.
///
/// Every field value, collection element, map key and index column is held
/// as a `Value` at the storage boundary. The derived ordering is the
/// ordering the encoded bytes sort in: values of different kinds compare by
/// kind (in declaration order), values of the same kind by content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Enum constant, ordered by ordinal.
    Enum {
        /// Position of the constant in its enum definition.
        ordinal: u32,
        /// Constant name.
        name: String,
    },
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Reference to an entity, by its 16-byte identifier.
    Reference([u8; 16]),
}

impl Value {
    /// Creates an enum value.
    pub fn enumeration(ordinal: u32, name: impl Into<String>) -> Self {
        Value::Enum {
            ordinal,
            name: name.into(),
        }
    }

    /// Creates a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Returns true for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a byte string.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the referenced identifier bytes, if this is a reference.
    #[must_use]
    pub fn as_reference(&self) -> Option<&[u8; 16]> {
        match self {
            Value::Reference(id) => Some(id),
            _ => None,
        }
    }

    /// Returns a short name of the value's kind, for error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Enum { .. } => "enum",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Reference(_) => "reference",
        }
    }

    /// Returns the type tag written in front of the encoded value.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Value::Null => tags::NULL,
            Value::Bool(_) => tags::BOOL,
            Value::Integer(_) => tags::INTEGER,
            Value::Enum { .. } => tags::ENUM,
            Value::Text(_) => tags::TEXT,
            Value::Bytes(_) => tags::BYTES,
            Value::Reference(_) => tags::REFERENCE,
        }
    }
}

/// Encoded type tags. Tag order matches variant order.
pub(crate) mod tags {
    pub const NULL: u8 = 0x01;
    pub const BOOL: u8 = 0x02;
    pub const INTEGER: u8 = 0x03;
    pub const ENUM: u8 = 0x04;
    pub const TEXT: u8 = 0x05;
    pub const BYTES: u8 = 0x06;
    pub const REFERENCE: u8 = 0x07;
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Enum { name, .. } => write!(f, "{name}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            Value::Reference(id) => {
                write!(f, "@")?;
                for byte in id {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_order_by_declaration() {
        let ordered = [
            Value::Null,
            Value::Bool(true),
            Value::Integer(-5),
            Value::enumeration(0, "A"),
            Value::text(""),
            Value::Bytes(vec![]),
            Value::Reference([0; 16]),
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{:?} < {:?}", pair[0], pair[1]);
            assert!(pair[0].tag() < pair[1].tag());
        }
    }

    #[test]
    fn enums_order_by_ordinal() {
        assert!(Value::enumeration(1, "Z") < Value::enumeration(2, "A"));
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::from(7).as_integer(), Some(7));
        assert_eq!(Value::from("x").as_text(), Some("x"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Null.as_text(), None);
        assert_eq!(Value::Integer(1).kind_name(), "integer");
    }

    #[test]
    fn display_reference_as_hex() {
        let mut id = [0u8; 16];
        id[15] = 0xab;
        assert_eq!(
            Value::Reference(id).to_string(),
            "@000000000000000000000000000000ab"
        );
    }
}
