use std::sync::Arc;

use bytes::Bytes;
use log::{trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;

use crate::command::{Command, Item};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Failure, TransportError};
use crate::resp::{RespDecoder, ReplyValue};

/// Owns a single duplex byte stream to a RESP server: wires inbound bytes
/// to the decoder, wires the engine's writes to the outbound half, and
/// exposes [`submit`](Self::submit) as the sole command entry point.
///
/// Connection pooling, reconnection, TLS, and authentication are the
/// caller's problem. This type speaks the wire protocol over whatever
/// already-connected stream it's given.
pub struct Connection {
    engine: Arc<Engine>,
    decoder: Arc<RespDecoder>,
    reader: JoinHandle<()>,
    config: Config,
}

impl Connection {
    /// Dials `addr` over TCP and wraps the resulting stream.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        config: Config,
    ) -> Result<Connection, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::from(e))?;
        stream.set_nodelay(true).ok();
        Ok(Connection::attach(stream, config))
    }

    /// Wraps an already-connected stream (for example one that has
    /// completed a TLS handshake or an auth exchange upstream, both out
    /// of scope here, so the caller does them first and hands over the
    /// resulting stream).
    pub fn attach<S>(stream: S, config: Config) -> Connection
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let decoder = Arc::new(RespDecoder::new());
        let engine = Engine::new(Box::new(write_half), Arc::clone(&decoder));

        let reader = spawn_reader(read_half, Arc::clone(&decoder), config.initial_read_buffer_size);

        Connection {
            engine,
            decoder,
            reader,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Submits a command and returns its decoded reply, or the failure the
    /// server (or the connection itself) produced for it.
    ///
    /// `inline_hint` should only be `true` for commands whose every
    /// argument is known to be short text with no whitespace or CR/LF; the
    /// wire encoder falls back to array form on its own if that turns out
    /// not to hold, but passing the hint correctly is what saves the
    /// framing overhead for the common case.
    pub async fn submit(
        &self,
        items: Vec<Item>,
        inline_hint: bool,
    ) -> Result<ReplyValue, Failure> {
        let rx = self.engine.submit(Command::new(items), inline_hint);
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(Failure::Transport(TransportError::closed())),
        }
    }

    /// Stops accepting new submissions and poisons the connection: the
    /// in-flight command (if any) and everything still queued fail with a
    /// transport error, matching the "abort with transport error" policy
    /// (see DESIGN.md for why this was chosen over drain-then-close).
    ///
    /// Also half-closes the underlying byte stream: the write half is
    /// shut down (sending a TCP FIN, or EOF to the peer side of an
    /// in-memory duplex stream) and the reader task that feeds the
    /// decoder is aborted so it stops blocking on its next read.
    pub async fn close(&self) {
        let err = TransportError::closed();
        self.engine.mark_closed(err.clone());
        self.decoder.close(err);
        self.engine.shutdown_writer().await;
        self.reader.abort();
    }
}

fn spawn_reader<R>(
    mut read_half: R,
    decoder: Arc<RespDecoder>,
    initial_buf_size: usize,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; initial_buf_size.max(1024)];
        loop {
            match read_half.read(&mut buf).await {
                Ok(0) => {
                    trace!("peer closed the connection");
                    decoder.close(TransportError::closed());
                    return;
                }
                Ok(n) => {
                    decoder.feed(Bytes::copy_from_slice(&buf[..n]));
                }
                Err(e) => {
                    warn!("read error on RESP connection: {e}");
                    decoder.close(TransportError::from(e));
                    return;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt};

    #[tokio::test]
    async fn get_missing_key_decodes_to_null() {
        let (client_io, mut server_io) = duplex(4096);
        let conn = Connection::attach(client_io, Config::default());

        tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            let _ = tokio::io::AsyncReadExt::read(&mut server_io, &mut buf).await;
            server_io.write_all(b"$-1\r\n").await.unwrap();
        });

        let reply = conn
            .submit(vec![Item::text("GET"), Item::text("nope")], false)
            .await
            .unwrap();
        assert_eq!(reply, ReplyValue::Null);
    }

    #[tokio::test]
    async fn set_then_get_round_trip() {
        let (client_io, mut server_io) = duplex(4096);
        let conn = Connection::attach(client_io, Config::default());

        tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            let _ = tokio::io::AsyncReadExt::read(&mut server_io, &mut buf).await;
            server_io.write_all(b"+OK\r\n").await.unwrap();
            let _ = tokio::io::AsyncReadExt::read(&mut server_io, &mut buf).await;
            server_io.write_all(b"$1\r\nv\r\n").await.unwrap();
        });

        let set_reply = conn
            .submit(vec![Item::text("SET"), Item::text("k"), Item::text("v")], true)
            .await
            .unwrap();
        assert_eq!(set_reply, ReplyValue::SimpleString("OK".into()));

        let get_reply = conn
            .submit(vec![Item::text("GET"), Item::text("k")], true)
            .await
            .unwrap();
        assert_eq!(
            get_reply,
            ReplyValue::BulkString(bytes::Bytes::from_static(b"v"))
        );
    }

    #[tokio::test]
    async fn hkeys_on_empty_key_is_empty_array() {
        let (client_io, mut server_io) = duplex(4096);
        let conn = Connection::attach(client_io, Config::default());

        tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            let _ = tokio::io::AsyncReadExt::read(&mut server_io, &mut buf).await;
            server_io.write_all(b"*0\r\n").await.unwrap();
        });

        let reply = conn
            .submit(vec![Item::text("HKEYS"), Item::text("emptykey")], false)
            .await
            .unwrap();
        assert_eq!(reply, ReplyValue::Array(vec![]));
    }

    #[tokio::test]
    async fn large_payload_round_trips_across_many_chunks() {
        let (client_io, mut server_io) = duplex(64 * 1024);
        let conn = Connection::attach(client_io, Config::default());

        let payload = vec![b'x'; 4 * 1024 * 1024];
        let payload_for_server = payload.clone();

        // The exact byte length of the array-form SET command the engine
        // will write, known up front so the fake server can drain exactly
        // that many bytes instead of guessing from read sizes.
        let set_command_len = {
            let header = format!(
                "*3\r\n$3\r\nSET\r\n$3\r\nbig\r\n${}\r\n",
                payload_for_server.len()
            );
            header.len() + payload_for_server.len() + 2
        };

        tokio::spawn(async move {
            let mut buf = vec![0u8; 16 * 1024];
            let mut drained = 0usize;
            while drained < set_command_len {
                let n = tokio::io::AsyncReadExt::read(&mut server_io, &mut buf)
                    .await
                    .unwrap();
                assert_ne!(n, 0, "connection closed before SET command was fully read");
                drained += n;
            }
            server_io.write_all(b"+OK\r\n").await.unwrap();

            let mut buf = vec![0u8; 256];
            let _ = tokio::io::AsyncReadExt::read(&mut server_io, &mut buf).await;

            let header = format!("${}\r\n", payload_for_server.len());
            server_io.write_all(header.as_bytes()).await.unwrap();

            // Deliver the bulk payload in a series of arbitrarily-sized
            // chunks, exercising fragmentation handling end to end.
            let mut offset = 0;
            let chunk_sizes = [
                1, 3, 7, 4096, 65536, 1, 1_000_000, 2_000_000, 999_999,
            ];
            let mut i = 0;
            while offset < payload_for_server.len() {
                let remaining = payload_for_server.len() - offset;
                let size = chunk_sizes[i % chunk_sizes.len()].min(remaining);
                server_io
                    .write_all(&payload_for_server[offset..offset + size])
                    .await
                    .unwrap();
                offset += size;
                i += 1;
            }
            server_io.write_all(b"\r\n").await.unwrap();
        });

        let set_reply = conn
            .submit(
                vec![
                    Item::text("SET"),
                    Item::text("big"),
                    Item::bytes(bytes::Bytes::from(payload.clone())),
                ],
                false,
            )
            .await
            .unwrap();
        assert_eq!(set_reply, ReplyValue::SimpleString("OK".into()));

        let get_reply = conn
            .submit(vec![Item::text("GET"), Item::text("big")], true)
            .await
            .unwrap();
        assert_eq!(get_reply.as_bytes().unwrap(), payload.as_slice());
    }

    #[tokio::test]
    async fn submit_after_close_fails_fast() {
        let (client_io, _server_io) = duplex(4096);
        let conn = Connection::attach(client_io, Config::default());
        conn.close().await;

        let reply = conn.submit(vec![Item::text("PING")], true).await;
        assert!(matches!(reply, Err(Failure::Transport(_))));
    }

    #[tokio::test]
    async fn close_half_closes_the_underlying_stream() {
        let (client_io, mut server_io) = duplex(4096);
        let conn = Connection::attach(client_io, Config::default());
        conn.close().await;

        // The write half was shut down, so the peer side of the duplex
        // stream sees EOF instead of hanging forever on its next read.
        let mut buf = vec![0u8; 16];
        let n = tokio::io::AsyncReadExt::read(&mut server_io, &mut buf)
            .await
            .unwrap();
        assert_eq!(n, 0);
    }
}
