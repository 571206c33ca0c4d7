use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::Notify;

use crate::chunk_queue::ChunkQueue;
use crate::error::{DecodeError, TransportError};

use super::value::ReplyValue;

/// A single tokenized unit pulled out of the chunk queue.
#[derive(Debug)]
enum Token {
    /// A non-bulk frame line, leading type byte included (`+OK`, `-ERR x`,
    /// `:42`, `*3`).
    Line(Bytes),
    /// The payload of a non-null, non-empty bulk string.
    Bulk(Bytes),
    /// Stands in for either `$-1\r\n` or what a `*-1\r\n` line resolves to.
    Null,
}

#[derive(Debug, Clone, Copy)]
enum TokenState {
    /// Scanning for a CRLF-terminated line.
    Line,
    /// Collecting the `len` remaining bytes (plus trailing CRLF) of a bulk
    /// string.
    Bulk(usize),
}

impl Default for TokenState {
    fn default() -> TokenState {
        TokenState::Line
    }
}

#[derive(Default)]
struct Tokenizer {
    queue: ChunkQueue,
    state: TokenState,
}

impl Tokenizer {
    fn append(&mut self, chunk: Bytes) {
        self.queue.append(chunk);
    }

    /// Pulls at most one token out of whatever is currently buffered.
    /// `Ok(None)` means "come back once more bytes arrive".
    fn try_next_token(&mut self) -> Result<Option<Token>, DecodeError> {
        loop {
            match self.state {
                TokenState::Line => {
                    let idx = match self.queue.index_of_crlf() {
                        Some(idx) => idx,
                        None => return Ok(None),
                    };

                    let raw = self.queue.take(idx + 2);
                    let line = raw.slice(0..idx);

                    if line.first() == Some(&b'$') {
                        let len = parse_len(&line[1..])?;
                        if len == -1 {
                            return Ok(Some(Token::Null));
                        }
                        self.state = TokenState::Bulk(len as usize);
                        continue;
                    }

                    return Ok(Some(Token::Line(line)));
                }
                TokenState::Bulk(len) => {
                    if self.queue.len() < len + 2 {
                        return Ok(None);
                    }

                    let raw = self.queue.take(len + 2);
                    let payload = raw.slice(0..len);
                    self.state = TokenState::Line;
                    return Ok(Some(Token::Bulk(payload)));
                }
            }
        }
    }
}

/// Parses a signed base-10 length/count, where `-1` is the only accepted
/// negative value.
fn parse_len(digits: &[u8]) -> Result<i64, DecodeError> {
    let s = std::str::from_utf8(digits).map_err(|_| DecodeError::InvalidUtf8)?;
    let n: i64 = s
        .parse()
        .map_err(|_| DecodeError::InvalidLength(s.to_string()))?;
    if n < -1 {
        return Err(DecodeError::InvalidLength(s.to_string()));
    }
    Ok(n)
}

struct Inner {
    tokenizer: Tokenizer,
    closed: Option<TransportError>,
}

/// Incrementally decodes a byte stream into a lazy sequence of
/// [`ReplyValue`]s.
///
/// Fed chunks via [`feed`](Self::feed) from whichever task is reading the
/// socket; [`next_reply`](Self::next_reply) is awaited by the command
/// engine's pump, one reply at a time. At most one `next_reply` call may be
/// outstanding at once.
pub struct RespDecoder {
    inner: Mutex<Inner>,
    notify: Notify,
    awaiting: AtomicBool,
}

impl Default for RespDecoder {
    fn default() -> RespDecoder {
        RespDecoder::new()
    }
}

impl RespDecoder {
    pub fn new() -> RespDecoder {
        RespDecoder {
            inner: Mutex::new(Inner {
                tokenizer: Tokenizer::default(),
                closed: None,
            }),
            notify: Notify::new(),
            awaiting: AtomicBool::new(false),
        }
    }

    /// Feeds a chunk of bytes just read off the wire. Non-blocking: the
    /// tokenizer runs synchronously and wakes an outstanding `next_reply`
    /// call if one exists.
    pub fn feed(&self, chunk: Bytes) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.tokenizer.append(chunk);
        }
        self.notify.notify_waiters();
    }

    /// Marks the decoder as permanently closed. Every outstanding and
    /// future `next_reply` call resolves with `err` (the first one wins).
    pub fn close(&self, err: TransportError) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.closed.get_or_insert(err);
        }
        self.notify.notify_waiters();
    }

    /// Resolves when the next top-level reply has been fully decoded, or
    /// with a [`TransportError`] if the connection is or becomes
    /// unusable first.
    ///
    /// # Panics
    /// Panics if another `next_reply` call is already outstanding.
    pub async fn next_reply(&self) -> Result<ReplyValue, TransportError> {
        if self.awaiting.swap(true, Ordering::SeqCst) {
            panic!("RespDecoder::next_reply called while another call is outstanding");
        }
        let result = self.read_value().await;
        self.awaiting.store(false, Ordering::SeqCst);
        result
    }

    fn read_value(&self) -> BoxFuture<'_, Result<ReplyValue, TransportError>> {
        Box::pin(async move {
            match self.next_token().await? {
                Token::Null => Ok(ReplyValue::Null),
                Token::Bulk(bytes) => Ok(ReplyValue::BulkString(bytes)),
                Token::Line(line) => self.assemble_line(line).await,
            }
        })
    }

    async fn next_token(&self) -> Result<Token, TransportError> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock().unwrap();
                match inner.tokenizer.try_next_token() {
                    Ok(Some(tok)) => return Ok(tok),
                    Ok(None) => {}
                    Err(e) => {
                        let err: TransportError = e.into();
                        inner.closed.get_or_insert_with(|| err.clone());
                        return Err(err);
                    }
                }
                if let Some(err) = &inner.closed {
                    return Err(err.clone());
                }
            }
            notified.await;
        }
    }

    async fn assemble_line(&self, line: Bytes) -> Result<ReplyValue, TransportError> {
        if line.is_empty() {
            return Err(DecodeError::UnknownType(0).into());
        }

        let tag = line[0];
        let rest = line.slice(1..);
        match tag {
            b'+' => Ok(ReplyValue::SimpleString(to_utf8(rest)?)),
            b'-' => Ok(ReplyValue::ServerError(to_utf8(rest)?)),
            b':' => {
                let s = to_utf8(rest)?;
                let n: i64 = s
                    .parse()
                    .map_err(|_| TransportError::from(DecodeError::InvalidLength(s)))?;
                Ok(ReplyValue::Integer(n))
            }
            b'*' => {
                let n = parse_len(&rest)?;
                if n == -1 {
                    return Ok(ReplyValue::Null);
                }
                let mut items = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    items.push(self.read_value().await?);
                }
                Ok(ReplyValue::Array(items))
            }
            other => Err(DecodeError::UnknownType(other).into()),
        }
    }
}

fn to_utf8(bytes: Bytes) -> Result<String, TransportError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8.into())
}
