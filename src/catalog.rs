//! A handful of convenience commands, thin wrappers over
//! [`Connection::submit`], in the spirit of (but nowhere near the size of)
//! a full command catalog.
//!
//! Real catalogs pick `inline_hint` per command: short, text-only control
//! commands go inline; anything carrying a value that might be large or
//! binary goes array-form. That's exactly what these three do, weighing
//! the value argument against `conn.config().inline_threshold`.

use bytes::Bytes;

use crate::command::Item;
use crate::connection::Connection;
use crate::error::Failure;
use crate::resp::ReplyValue;

/// `PING` always inline. It never carries a value.
pub async fn ping(conn: &Connection) -> Result<(), Failure> {
    conn.submit(vec![Item::text("PING")], true).await?;
    Ok(())
}

/// `GET key` inline, since keys are short control-ish text.
pub async fn get(conn: &Connection, key: &str) -> Result<Option<Bytes>, Failure> {
    let reply = conn
        .submit(vec![Item::text("GET"), Item::text(key)], true)
        .await?;
    Ok(match reply {
        ReplyValue::Null => None,
        ReplyValue::BulkString(b) => Some(b),
        other => {
            return Err(Failure::ServerError(format!(
                "unexpected reply to GET: {other:?}"
            )))
        }
    })
}

/// `SET key value`. Picks `inline_hint` itself from
/// `conn.config().inline_threshold`: text values at or below the threshold
/// go inline, anything longer or binary goes array-form.
pub async fn set(conn: &Connection, key: &str, value: impl Into<Item>) -> Result<(), Failure> {
    let value = value.into();
    let inline_hint = is_inline_eligible(conn, &value);
    conn.submit(vec![Item::text("SET"), Item::text(key), value], inline_hint)
        .await?;
    Ok(())
}

/// Whether `item` is short enough text to offer as an inline command
/// argument, per `conn.config().inline_threshold`.
fn is_inline_eligible(conn: &Connection, item: &Item) -> bool {
    match item {
        Item::Text(s) => s.len() <= conn.config().inline_threshold,
        Item::Bytes(_) => false,
    }
}
