/// Async tasks backing a real-time session
///
/// A running session is served by three tasks: a writer that owns the
/// socket's send half and drains an outgoing queue, a reader that parses
/// incoming frames into typed server messages, and a producer that turns
/// the caller's audio source into flow-controlled binary chunks. The
/// session's dispatch loop coordinates them over channels.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::messages::{ClientMessage, ServerMessage};
use crate::realtime::error::{RealtimeError, RealtimeResult};
use crate::realtime::transport::{WsReader, WsWriter};

/// Writer task that owns the socket's send half.
///
/// Drains the outgoing queue until every sender is dropped, then closes
/// the socket. Keeping all sends on one task preserves the order in which
/// control messages and audio chunks were queued.
pub(crate) async fn writer_task(
    mut ws_writer: WsWriter,
    mut outgoing_rx: mpsc::Receiver<Message>,
) -> RealtimeResult<()> {
    debug!("Writer task started");

    let mut sent = 0u64;

    while let Some(message) = outgoing_rx.recv().await {
        sent += 1;
        ws_writer
            .send(message)
            .await
            .map_err(RealtimeError::WebSocket)?;
    }

    debug!("Writer task completed: {} messages sent, queue closed", sent);

    if let Err(e) = ws_writer.close().await {
        warn!("Failed to close WebSocket writer: {}", e);
    }

    Ok(())
}

/// Reader task that parses incoming frames and forwards them to the
/// session's dispatch loop.
///
/// Handles ping/pong and close frames; any other frame must be a JSON
/// control message.
pub(crate) async fn reader_task(
    mut ws_reader: WsReader,
    message_tx: mpsc::Sender<ServerMessage>,
) -> RealtimeResult<()> {
    debug!("Reader task started");

    let mut received = 0u64;

    while let Some(frame) = ws_reader.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(message) => {
                        received += 1;
                        if message_tx.send(message).await.is_err() {
                            debug!("Session loop gone, stopping reader");
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to deserialize server message: {}", e);
                        return Err(RealtimeError::Serialization(e));
                    }
                }
            }
            Ok(Message::Close(frame)) => {
                info!("Received close frame: {:?}", frame);
                break;
            }
            Ok(Message::Ping(data)) => {
                debug!("Received ping, length: {} bytes", data.len());
                // Pong is handled automatically by the underlying library
            }
            Ok(Message::Pong(_)) => {
                debug!("Received pong");
            }
            Ok(Message::Binary(data)) => {
                warn!("Received unexpected binary message: {} bytes", data.len());
            }
            Ok(Message::Frame(_)) => {
                debug!("Received raw frame");
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                return Err(RealtimeError::WebSocket(e));
            }
        }
    }

    debug!(
        "Reader task completed: {} messages received, stream ended",
        received
    );

    Ok(())
}

/// Producer task that streams the audio source to the server.
///
/// Waits for the session to enter streaming, then reads the source in
/// bounded chunks. Each chunk consumes one flow-control permit (released
/// by the dispatch loop when the server acknowledges it) and is queued as
/// a binary frame. When the source is exhausted, or shutdown is signalled,
/// an `EndOfStream` message with the final sequence number is queued.
pub(crate) async fn producer_task<A>(
    mut audio: A,
    outgoing_tx: mpsc::Sender<Message>,
    permits: Arc<Semaphore>,
    acquire_timeout: Duration,
    chunk_size: usize,
    started_rx: oneshot::Receiver<()>,
    mut shutdown_rx: watch::Receiver<bool>,
    seq_no: Arc<AtomicU64>,
) -> RealtimeResult<()>
where
    A: AsyncRead + Unpin,
{
    debug!("Producer task started");

    // Audio must not be sent before the server acknowledges the
    // configuration. If the session dies first, there is nothing to do.
    tokio::select! {
        _ = shutdown_rx.changed() => {
            debug!("Shutdown before recognition started, producer exiting");
            return Ok(());
        }
        started = started_rx => {
            if started.is_err() {
                debug!("Session ended before recognition started, producer exiting");
                return Ok(());
            }
        }
    }

    let mut buf = vec![0u8; chunk_size.max(1)];

    'stream: loop {
        if *shutdown_rx.borrow() {
            debug!("Shutdown signalled, producer stopping");
            break;
        }

        let n = tokio::select! {
            _ = shutdown_rx.changed() => break 'stream,
            read = audio.read(&mut buf) => {
                read.map_err(|e| RealtimeError::AudioSource(e.to_string()))?
            }
        };

        if n == 0 {
            debug!("Audio source exhausted");
            break;
        }

        let permit = tokio::select! {
            _ = shutdown_rx.changed() => break 'stream,
            acquired = tokio::time::timeout(acquire_timeout, permits.acquire()) => {
                match acquired {
                    Ok(Ok(permit)) => permit,
                    // Semaphore closed: the session is tearing down
                    Ok(Err(_)) => break 'stream,
                    Err(_) => return Err(RealtimeError::BufferAcquireTimeout),
                }
            }
        };
        // Consumed here, released by the dispatch loop on AudioAdded
        permit.forget();

        seq_no.fetch_add(1, Ordering::SeqCst);
        if outgoing_tx
            .send(Message::Binary(buf[..n].to_vec().into()))
            .await
            .is_err()
        {
            debug!("Outgoing queue closed, producer exiting");
            return Ok(());
        }
    }

    let last_seq_no = seq_no.load(Ordering::SeqCst);
    let end_of_stream = ClientMessage::end_of_stream(last_seq_no);
    let json = serde_json::to_string(&end_of_stream)?;

    debug!(last_seq_no, "Sending EndOfStream");
    if outgoing_tx.send(Message::Text(json.into())).await.is_err() {
        debug!("Outgoing queue closed before EndOfStream could be sent");
    }

    info!(chunks = last_seq_no, "Producer task completed");
    Ok(())
}
