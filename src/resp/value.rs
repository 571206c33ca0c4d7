use bytes::Bytes;

/// A decoded RESP reply.
///
/// Bulk strings stay as bytes until the caller asks otherwise. The
/// decoder never peeks at the payload to decide whether it "looks like"
/// text, unlike an in-band string/bytes tagging scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyValue {
    /// A null bulk string (`$-1\r\n`) or null array (`*-1\r\n`). The two
    /// encodings are indistinguishable once decoded, by design.
    Null,
    Integer(i64),
    SimpleString(String),
    BulkString(Bytes),
    Array(Vec<ReplyValue>),
    /// A `-…\r\n` reply. Valid both as a top-level command failure (see
    /// [`crate::error::Failure`]) and as an element nested inside an
    /// `Array`, where it is returned as data rather than promoted to a
    /// failure.
    ServerError(String),
}

impl ReplyValue {
    /// The bulk string bytes, if this is a non-null `BulkString`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ReplyValue::BulkString(b) => Some(b.as_ref()),
            _ => None,
        }
    }

    /// A UTF-8 view of whichever reply variant carries text, if any.
    /// Invalid UTF-8 in a bulk string yields `None` rather than panicking
    /// or lossily replacing bytes.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ReplyValue::SimpleString(s) => Some(s.as_str()),
            ReplyValue::BulkString(b) => std::str::from_utf8(b.as_ref()).ok(),
            ReplyValue::ServerError(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ReplyValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ReplyValue]> {
        match self {
            ReplyValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ReplyValue::Null)
    }
}
