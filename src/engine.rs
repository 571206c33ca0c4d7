use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use log::{debug, trace};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, Mutex as AsyncMutex};

use crate::command::{Command, QueuedCommand};
use crate::error::{Failure, TransportError};
use crate::resp::{encoder, RespDecoder, ReplyValue};

/// The boxed half of the duplex stream the engine writes commands to.
pub(crate) type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

struct EngineState {
    queue: VecDeque<QueuedCommand>,
}

/// Accepts command submissions, serializes them FIFO onto the wire, and
/// resolves each one with exactly the reply the decoder hands back for it
/// in turn.
///
/// The "pump" is a single-flight driver loop: [`submit`](Self::submit)
/// starts it if it isn't already running, and it self-terminates once the
/// queue drains. Re-entrant submissions (from any task) are safe: they
/// only ever touch the queue through the internal mutex.
pub(crate) struct Engine {
    state: StdMutex<EngineState>,
    pump_active: AtomicBool,
    writer: AsyncMutex<BoxedWriter>,
    decoder: Arc<RespDecoder>,
    closed: StdMutex<Option<TransportError>>,
}

impl Engine {
    pub(crate) fn new(writer: BoxedWriter, decoder: Arc<RespDecoder>) -> Arc<Engine> {
        Arc::new(Engine {
            state: StdMutex::new(EngineState {
                queue: VecDeque::new(),
            }),
            pump_active: AtomicBool::new(false),
            writer: AsyncMutex::new(writer),
            decoder,
            closed: StdMutex::new(None),
        })
    }

    /// Appends a command to the FIFO and starts the pump if it isn't
    /// already running. Fails fast, without enqueueing, if the connection
    /// is already poisoned.
    pub(crate) fn submit(
        self: &Arc<Self>,
        command: Command,
        inline_hint: bool,
    ) -> oneshot::Receiver<Result<ReplyValue, Failure>> {
        let (tx, rx) = oneshot::channel();

        if let Some(err) = self.closed.lock().unwrap().clone() {
            let _ = tx.send(Err(Failure::Transport(err)));
            return rx;
        }

        {
            let mut state = self.state.lock().unwrap();
            state.queue.push_back(QueuedCommand {
                command,
                inline_hint,
                completion: tx,
            });
        }

        if !self.pump_active.swap(true, Ordering::SeqCst) {
            let engine = Arc::clone(self);
            tokio::spawn(async move {
                engine.pump().await;
            });
        }

        rx
    }

    /// Marks the connection as poisoned so future submissions fail fast.
    /// Does not itself resolve in-flight or already-queued commands. That
    /// happens once the pump observes the same failure via the decoder or
    /// a write error, which [`crate::connection::Connection::close`]
    /// triggers by closing the decoder and shutting down the writer.
    pub(crate) fn mark_closed(&self, err: TransportError) {
        self.closed.lock().unwrap().get_or_insert(err);
    }

    /// Half-closes the write side of the underlying stream. Waits for any
    /// write currently in flight to finish first, since both share the
    /// same writer lock.
    pub(crate) async fn shutdown_writer(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }

    async fn pump(self: Arc<Self>) {
        debug!("command engine pump started");
        loop {
            let next = {
                let mut state = self.state.lock().unwrap();
                state.queue.pop_front()
            };

            let queued = match next {
                Some(queued) => queued,
                None => {
                    self.pump_active.store(false, Ordering::SeqCst);
                    let still_pending = !self.state.lock().unwrap().queue.is_empty();
                    if still_pending && !self.pump_active.swap(true, Ordering::SeqCst) {
                        continue;
                    }
                    debug!("command engine pump drained, exiting");
                    return;
                }
            };

            self.drive_one(queued).await;
        }
    }

    async fn drive_one(&self, queued: QueuedCommand) {
        let QueuedCommand {
            command,
            inline_hint,
            completion,
        } = queued;

        let encoded = encoder::encode(&command, inline_hint);
        trace!("writing {} bytes onto the wire", encoded.len());

        let write_result = {
            let mut writer = self.writer.lock().await;
            writer.write_all(&encoded).await.map_err(TransportError::from)
        };

        if let Err(err) = write_result {
            let _ = completion.send(Err(Failure::Transport(err.clone())));
            self.fail_all(err);
            return;
        }

        match self.decoder.next_reply().await {
            Ok(ReplyValue::ServerError(msg)) => {
                let _ = completion.send(Err(Failure::ServerError(msg)));
            }
            Ok(value) => {
                let _ = completion.send(Ok(value));
            }
            Err(err) => {
                let _ = completion.send(Err(Failure::Transport(err.clone())));
                self.fail_all(err);
            }
        }
    }

    /// Fatal path: poisons the connection and resolves every queued
    /// command (the in-flight one has already been resolved by the
    /// caller) with the same transport error.
    fn fail_all(&self, err: TransportError) {
        self.closed.lock().unwrap().get_or_insert(err.clone());

        let drained: Vec<QueuedCommand> = {
            let mut state = self.state.lock().unwrap();
            state.queue.drain(..).collect()
        };

        for queued in drained {
            let _ = queued.completion.send(Err(Failure::Transport(err.clone())));
        }
    }
}
