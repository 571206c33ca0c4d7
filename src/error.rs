use std::fmt;

/// The kind of transport failure that poisoned a connection.
///
/// Mirrors the small, closed taxonomy the decoder and the engine actually
/// distinguish between: sockets don't hand back rich error types, so there's
/// no point inventing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The underlying byte stream was closed, by either side.
    Closed,
    /// A read or write on the byte stream failed.
    Io,
    /// The decoder saw bytes that don't fit the RESP grammar (unknown type
    /// byte, non-numeric length, or similar).
    Framing,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Closed => "connection closed".fmt(f),
            TransportErrorKind::Io => "i/o error".fmt(f),
            TransportErrorKind::Framing => "framing error".fmt(f),
        }
    }
}

/// A fatal, connection-wide failure.
///
/// Once one of these occurs, every queued and in-flight command is resolved
/// with a clone of it and no further submission is accepted.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub detail: String,
}

impl TransportError {
    pub fn closed() -> TransportError {
        TransportError {
            kind: TransportErrorKind::Closed,
            detail: String::from("connection closed"),
        }
    }

    pub fn framing(detail: impl Into<String>) -> TransportError {
        TransportError {
            kind: TransportErrorKind::Framing,
            detail: detail.into(),
        }
    }

    pub fn io(err: &std::io::Error) -> TransportError {
        TransportError {
            kind: TransportErrorKind::Io,
            detail: err.to_string(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> TransportError {
        TransportError::io(&err)
    }
}

/// Everything a command submission can fail with.
///
/// A server error is local to the command that produced it; a transport
/// error poisons the whole connection.
#[derive(Debug, Clone)]
pub enum Failure {
    /// The server replied with a `-…` error frame. The text is preserved
    /// verbatim, including the leading error-code token (`ERR`, `WRONGTYPE`, …).
    ServerError(String),
    /// The connection is no longer usable.
    Transport(TransportError),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::ServerError(msg) => msg.as_str().fmt(f),
            Failure::Transport(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Failure {}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Failure {
        Failure::Transport(err)
    }
}

/// Errors raised while tokenizing or assembling RESP replies.
///
/// Framing errors are always fatal to the connection; see
/// [`TransportError`].
#[derive(Debug, Clone)]
pub enum DecodeError {
    /// The first byte of a line token wasn't one of `+ - : $ *`.
    UnknownType(u8),
    /// A declared length/count wasn't a valid base-10 integer, or was a
    /// negative value other than the `-1` null sentinel.
    InvalidLength(String),
    /// The bulk string or simple string payload was not valid UTF-8 where
    /// UTF-8 was required (integers, lengths).
    InvalidUtf8,
    /// The byte stream ended in the middle of a frame.
    UnexpectedEof,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownType(b) => write!(f, "unknown RESP type byte: {:?}", *b as char),
            DecodeError::InvalidLength(s) => write!(f, "invalid length/count: {}", s),
            DecodeError::InvalidUtf8 => "invalid utf-8 in RESP frame".fmt(f),
            DecodeError::UnexpectedEof => "unexpected end of stream mid-frame".fmt(f),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for TransportError {
    fn from(err: DecodeError) -> TransportError {
        TransportError::framing(err.to_string())
    }
}
