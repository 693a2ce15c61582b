use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::codec::{LineBuffer, decode_line};
use crate::errors::{ClientError, SessionFailure};
use crate::events::StreamEvent;
use crate::request::SummaryRequest;
use crate::stream::{ClientResult, FinalSummary};
use crate::summary::{StructuredSummary, fold};
use crate::transport::Transport;

/// Handle used to request cancellation of a running session.
///
/// Cancellation is cooperative: it is observed at the next read or pacing
/// suspension point, never mid-fold. The session closes the connection and
/// emits no terminal result; `SummaryStream::finish` returns
/// `ClientError::Cancelled`.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Streaming handle for one summary request.
///
/// Use `next_result()` to consume results as they arrive and `finish()` to
/// obtain the final document after the terminal result.
#[derive(Debug)]
pub struct SummaryStream {
    request_id: uuid::Uuid,
    rx: mpsc::Receiver<ClientResult>,
    final_rx: oneshot::Receiver<Result<FinalSummary, ClientError>>,
    cancel_handle: CancelHandle,
    saw_terminal: bool,
}

impl SummaryStream {
    /// Returns the id of the underlying request.
    pub fn request_id(&self) -> uuid::Uuid {
        self.request_id
    }

    /// Returns a handle that can cancel the session.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel_handle.clone()
    }

    /// Waits for and returns the next client-visible result.
    ///
    /// Returns `None` once the session has ended and all results are drained.
    pub async fn next_result(&mut self) -> Option<ClientResult> {
        let result = self.rx.recv().await;
        if let Some(ClientResult::Complete { .. } | ClientResult::Error { .. }) = &result {
            self.saw_terminal = true;
        }
        result
    }

    /// Drains remaining results (if needed) and returns the terminal outcome.
    ///
    /// Safe to call after consuming results manually with `next_result()`.
    pub async fn finish(mut self) -> Result<FinalSummary, ClientError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(ClientResult::Complete { .. } | ClientResult::Error { .. }) => {
                    self.saw_terminal = true;
                }
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(ClientError::protocol_msg(
                "session task ended without a final result",
            )),
        }
    }
}

/// Spawns the session task for a validated request and returns its handle.
pub(crate) fn spawn_session(
    transport: Arc<dyn Transport>,
    request: SummaryRequest,
) -> SummaryStream {
    let (tx, rx) = mpsc::channel(request.options.stream_buffer_capacity);
    let (final_tx, final_rx) = oneshot::channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel_handle = CancelHandle { tx: cancel_tx };
    let request_id = request.request_id;
    tokio::spawn(session_task(transport, request, tx, final_tx, cancel_rx));
    SummaryStream {
        request_id,
        rx,
        final_rx,
        cancel_handle,
        saw_terminal: false,
    }
}

async fn session_task(
    transport: Arc<dyn Transport>,
    request: SummaryRequest,
    tx: mpsc::Sender<ClientResult>,
    final_tx: oneshot::Sender<Result<FinalSummary, ClientError>>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let request_id = request.request_id;
    let pacing = request.options.pacing;
    debug!(request_id = %request_id, style = %request.style, "opening summary stream");

    let mut body = match transport.open_stream(&request).await {
        Ok(body) => body,
        Err(err) => {
            let _ = send_result(&tx, ClientResult::Error {
                message: err.to_string(),
            })
            .await;
            let _ = final_tx.send(Err(ClientError::SessionFailed(SessionFailure::Transport(
                err,
            ))));
            return;
        }
    };

    let mut lines = LineBuffer::default();
    let mut pending: VecDeque<String> = VecDeque::new();
    let mut current = StructuredSummary::default();
    let mut last_tokens: u64 = 0;
    let mut body_done = false;
    let mut cancel_closed = false;

    loop {
        // Pull the next complete line, refilling from the body as needed.
        // This is one of the two suspension points where cancellation is
        // observed; dropping the body closes the connection.
        let line = loop {
            if let Some(line) = pending.pop_front() {
                break Some(line);
            }
            if body_done {
                break None;
            }
            tokio::select! {
                changed = cancel_rx.changed(), if !cancel_closed => {
                    match changed {
                        Ok(_) if *cancel_rx.borrow() => {
                            drop(body);
                            let _ = final_tx.send(Err(ClientError::Cancelled));
                            return;
                        }
                        Ok(_) => {}
                        Err(_) => cancel_closed = true,
                    }
                }
                next = body.next() => {
                    match next {
                        Some(Ok(chunk)) => pending.extend(lines.push_chunk(&chunk)),
                        Some(Err(err)) => {
                            let _ = send_result(&tx, ClientResult::Error {
                                message: err.to_string(),
                            })
                            .await;
                            let _ = final_tx.send(Err(ClientError::SessionFailed(
                                SessionFailure::Transport(err),
                            )));
                            return;
                        }
                        None => {
                            pending.extend(lines.finish());
                            body_done = true;
                        }
                    }
                }
            }
        };

        let Some(line) = line else {
            // Body exhausted without a terminal event.
            let message = "stream closed unexpectedly".to_string();
            let _ = send_result(&tx, ClientResult::Error {
                message: message.clone(),
            })
            .await;
            let _ = final_tx.send(Err(ClientError::SessionFailed(SessionFailure::Protocol {
                message,
            })));
            return;
        };

        let event = match decode_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(err) => {
                warn!(request_id = %request_id, error = %err, "skipping malformed event line");
                continue;
            }
        };

        match event {
            StreamEvent::Metadata(metadata) => {
                debug!(request_id = %request_id, input_type = %metadata.input_type, "stream metadata");
                if !send_result(&tx, ClientResult::Metadata(metadata)).await {
                    let _ = final_tx.send(Err(ClientError::protocol_msg(
                        "result receiver dropped during stream",
                    )));
                    return;
                }
            }
            StreamEvent::Patch {
                delta,
                state,
                done,
                tokens_used,
                latency_ms,
            } => {
                if tokens_used < last_tokens {
                    // Protocol oddity, not fatal: the snapshot stays authoritative.
                    warn!(
                        request_id = %request_id,
                        tokens_used,
                        last_tokens,
                        "tokens_used regressed between patch events"
                    );
                }
                last_tokens = last_tokens.max(tokens_used);
                current = fold(current, state);

                if done {
                    debug!(request_id = %request_id, tokens_used, "summary stream complete");
                    let summary = current;
                    let sent = send_result(&tx, ClientResult::Complete {
                        summary: summary.clone(),
                        tokens_used,
                        latency_ms,
                    })
                    .await;
                    let _ = final_tx.send(if sent {
                        Ok(FinalSummary {
                            summary,
                            tokens_used,
                            latency_ms,
                        })
                    } else {
                        Err(ClientError::protocol_msg(
                            "result receiver dropped before completion",
                        ))
                    });
                    return;
                }

                let sent = send_result(&tx, ClientResult::Progress {
                    state: current.clone(),
                    tokens_used,
                    delta,
                })
                .await;
                if !sent {
                    let _ = final_tx.send(Err(ClientError::protocol_msg(
                        "result receiver dropped during stream",
                    )));
                    return;
                }
                // Second cancellation-observing suspension point.
                if pace_or_cancel(&mut cancel_rx, &mut cancel_closed, pacing).await {
                    drop(body);
                    let _ = final_tx.send(Err(ClientError::Cancelled));
                    return;
                }
            }
            StreamEvent::Error {
                message,
                tokens_used,
            } => {
                debug!(request_id = %request_id, tokens_used, "summary stream failed: {message}");
                let _ = send_result(&tx, ClientResult::Error {
                    message: message.clone(),
                })
                .await;
                let _ = final_tx.send(Err(ClientError::SessionFailed(SessionFailure::Protocol {
                    message,
                })));
                return;
            }
        }
    }
}

/// Sleeps the pacing delay while staying responsive to cancellation.
/// Returns true when the session was cancelled.
async fn pace_or_cancel(
    cancel_rx: &mut watch::Receiver<bool>,
    cancel_closed: &mut bool,
    pacing: Duration,
) -> bool {
    if pacing.is_zero() {
        return *cancel_rx.borrow();
    }
    let sleep = tokio::time::sleep(pacing);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            changed = cancel_rx.changed(), if !*cancel_closed => {
                match changed {
                    Ok(_) if *cancel_rx.borrow() => return true,
                    Ok(_) => {}
                    Err(_) => *cancel_closed = true,
                }
            }
            _ = &mut sleep => return false,
        }
    }
}

async fn send_result(tx: &mpsc::Sender<ClientResult>, result: ClientResult) -> bool {
    tx.send(result).await.is_ok()
}
