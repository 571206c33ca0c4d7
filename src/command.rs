use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::Failure;
use crate::resp::ReplyValue;

/// A single command argument.
#[derive(Debug, Clone)]
pub enum Item {
    /// UTF-8 text. The caller renders numeric arguments to text before
    /// submission.
    Text(String),
    /// An opaque binary payload.
    Bytes(Bytes),
}

impl Item {
    pub fn text(s: impl Into<String>) -> Item {
        Item::Text(s.into())
    }

    pub fn bytes(b: impl Into<Bytes>) -> Item {
        Item::Bytes(b.into())
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Item {
        Item::Text(s.to_string())
    }
}

impl From<String> for Item {
    fn from(s: String) -> Item {
        Item::Text(s)
    }
}

impl From<Bytes> for Item {
    fn from(b: Bytes) -> Item {
        Item::Bytes(b)
    }
}

impl From<Vec<u8>> for Item {
    fn from(b: Vec<u8>) -> Item {
        Item::Bytes(Bytes::from(b))
    }
}

/// An ordered sequence of argument items to send as one command.
#[derive(Debug, Clone)]
pub struct Command {
    pub items: Vec<Item>,
}

impl Command {
    pub fn new(items: Vec<Item>) -> Command {
        Command { items }
    }
}

/// A command submitted to the engine, queued behind any in-flight command
/// until its turn to be written comes up.
///
/// Destroyed the moment its reply is resolved, either with the decoded
/// value, a command-level [`Failure::ServerError`], or, on a poisoned
/// connection, a [`Failure::Transport`].
pub(crate) struct QueuedCommand {
    pub(crate) command: Command,
    pub(crate) inline_hint: bool,
    pub(crate) completion: oneshot::Sender<Result<ReplyValue, Failure>>,
}
