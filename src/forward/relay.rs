//! Chunk relay loop for streaming mode.
//!
//! ```text
//! RELAY_LOOP { READ_CHUNK → DECODE → WRITE → FLUSH → DELAY }* → CLOSE
//! ```
//!
//! The loop is strictly sequential: the next upstream chunk is not read until
//! the previous one has been written and flushed to the client. While waiting
//! on upstream the loop also watches the sink, so an idle upstream is dropped
//! as soon as the client leaves.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use axum::body::{Body, Bytes};
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::forward::decoder::Utf8Decoder;
use crate::observability::metrics;

/// The downstream client went away; nothing more can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientGone;

/// Destination for relayed chunks.
pub trait ChunkSink {
    /// Hand one chunk to the client connection.
    fn write(&mut self, chunk: Bytes) -> impl Future<Output = Result<(), ClientGone>> + Send;

    /// Wait until everything written so far has been taken by the transport.
    fn flush(&mut self) -> impl Future<Output = Result<(), ClientGone>> + Send;

    /// Resolve once the client can no longer receive anything.
    fn closed(&self) -> impl Future<Output = ()> + Send;
}

/// Sink feeding an axum response body through a single-slot channel.
///
/// Dropping the sink ends the body cleanly.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<Result<Bytes, Infallible>>,
}

impl ChannelSink {
    /// Create a sink and the response body it feeds.
    pub fn channel() -> (Self, Body) {
        let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(1);
        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });
        (Self { tx }, Body::from_stream(stream))
    }
}

impl ChunkSink for ChannelSink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), ClientGone> {
        self.tx.send(Ok(chunk)).await.map_err(|_| ClientGone)
    }

    async fn flush(&mut self) -> Result<(), ClientGone> {
        // A free slot means the body has taken the previous frame.
        self.tx.reserve().await.map(drop).map_err(|_| ClientGone)
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

/// How a relay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// Upstream signalled completion.
    Completed,
    /// Upstream failed after the response had started.
    UpstreamFailed,
    /// The client disconnected; upstream reading was abandoned.
    ClientGone,
}

/// Summary of a finished relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOutcome {
    pub end: RelayEnd,
    pub chunks: usize,
    pub bytes: usize,
}

/// Copy `upstream` into `sink` chunk by chunk.
///
/// Empty chunks are skipped. After each written chunk the sink is flushed and
/// the task sleeps for `chunk_delay` (zero disables the pause).
pub async fn relay<S, E, K>(upstream: S, mut sink: K, chunk_delay: Duration) -> RelayOutcome
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
    K: ChunkSink,
{
    let mut upstream = std::pin::pin!(upstream);
    let mut decoder = Utf8Decoder::new();
    let mut outcome = RelayOutcome {
        end: RelayEnd::Completed,
        chunks: 0,
        bytes: 0,
    };

    loop {
        let next = tokio::select! {
            next = upstream.next() => next,
            () = sink.closed() => {
                tracing::info!(chunks = outcome.chunks, "Client disconnected while upstream was idle");
                outcome.end = RelayEnd::ClientGone;
                return outcome;
            }
        };
        let text = match next {
            Some(Ok(chunk)) => {
                if chunk.is_empty() {
                    continue;
                }
                decoder.decode(&chunk)
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, chunks = outcome.chunks, "Upstream stream failed mid-response");
                outcome.end = RelayEnd::UpstreamFailed;
                break;
            }
            None => break,
        };

        if text.is_empty() {
            continue;
        }
        if write_and_flush(&mut sink, text, &mut outcome).await.is_err() {
            tracing::info!(chunks = outcome.chunks, "Client disconnected, abandoning upstream");
            outcome.end = RelayEnd::ClientGone;
            return outcome;
        }

        if !chunk_delay.is_zero() {
            tokio::time::sleep(chunk_delay).await;
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() && write_and_flush(&mut sink, tail, &mut outcome).await.is_err() {
        tracing::debug!("Client disconnected before the final chunk");
        outcome.end = RelayEnd::ClientGone;
    }
    outcome
}

async fn write_and_flush<K: ChunkSink>(
    sink: &mut K,
    text: String,
    outcome: &mut RelayOutcome,
) -> Result<(), ClientGone> {
    let len = text.len();
    sink.write(Bytes::from(text)).await?;
    sink.flush().await?;
    outcome.chunks += 1;
    outcome.bytes += len;
    metrics::record_stream_chunk(len);
    Ok(())
}
