//! An asynchronous client core for RESP-speaking servers (Redis and its
//! workalikes): a streaming decoder, a pipelined request/reply engine, and
//! the thin connection facade that ties them to a byte stream.
//!
//! This crate deliberately does not include the hundreds of convenience
//! commands (`GET`, `HSET`, `XADD`, …) a full client exposes. See
//! [`catalog`] for the handful kept around to demonstrate the core end to
//! end. It also does not dial TLS, authenticate, pool connections, retry,
//! or fan out pub/sub messages; those all live above or beside this core.

pub mod catalog;
pub mod chunk_queue;
pub mod command;
pub mod config;
pub mod connection;
pub(crate) mod engine;
pub mod error;
pub mod resp;

pub use command::Item;
pub use config::Config;
pub use connection::Connection;
pub use error::{DecodeError, Failure, TransportError, TransportErrorKind};
pub use resp::ReplyValue;
