//! The stream multiplexer: one wrapper around an adapter's delta stream
//! that normalizes termination.
//!
//! Guarantees, in consumer terms:
//! - deltas arrive in producer order, pull-based (backpressure is the
//!   consumer's poll cadence; nothing is buffered);
//! - exactly one final delta is ever emitted, synthesized with finish
//!   reason `Stop` when the source closes without marking one;
//! - a mid-stream source error is terminal and follows every delta that
//!   was already produced, so a failure never looks like a clean finish;
//! - cancellation is raced, biased, against every pull; the source is
//!   dropped before the terminal `Canceled` error surfaces, which closes
//!   the underlying transport.

use async_stream::try_stream;
use futures_util::StreamExt;
use pprovider::{BoxedDeltaStream, FinishReason, StreamDelta, VendorError};
use tokio_util::sync::CancellationToken;

pub fn multiplex(inner: BoxedDeltaStream, cancel: CancellationToken) -> BoxedDeltaStream {
    let stream = try_stream! {
        let mut inner = inner;
        let mut finished = false;

        loop {
            let pulled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = inner.next() => Some(item),
            };

            let Some(item) = pulled else {
                drop(inner);
                Err(VendorError::canceled("stream canceled by caller"))?;
                break;
            };

            match item {
                Some(Ok(delta)) => {
                    let is_final = delta.is_final;
                    yield delta;
                    if is_final {
                        finished = true;
                        break;
                    }
                }
                Some(Err(error)) => {
                    finished = true;
                    Err(error)?;
                    break;
                }
                None => break,
            }
        }

        if !finished {
            yield StreamDelta::finish(FinishReason::Stop);
        }
    };

    Box::pin(stream) as BoxedDeltaStream
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use pprovider::{VecDeltaStream, VendorErrorKind};

    use super::*;

    async fn collect(mut stream: BoxedDeltaStream) -> (Vec<StreamDelta>, Option<VendorError>) {
        let mut deltas = Vec::new();
        let mut terminal = None;

        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) => deltas.push(delta),
                Err(error) => {
                    terminal = Some(error);
                    break;
                }
            }
        }

        (deltas, terminal)
    }

    #[tokio::test]
    async fn synthesizes_exactly_one_final_when_source_closes_unmarked() {
        let source = VecDeltaStream::new(vec![
            Ok(StreamDelta::text("Hel")),
            Ok(StreamDelta::text("lo")),
        ]);

        let (deltas, terminal) =
            collect(multiplex(Box::pin(source), CancellationToken::new())).await;

        assert!(terminal.is_none());
        assert_eq!(deltas.len(), 3);

        let text = deltas
            .iter()
            .filter(|delta| !delta.is_final)
            .map(|delta| delta.text.as_str())
            .collect::<String>();
        assert_eq!(text, "Hello");

        let finals = deltas.iter().filter(|delta| delta.is_final).count();
        assert_eq!(finals, 1);
        assert_eq!(
            deltas.last().and_then(|delta| delta.finish),
            Some(FinishReason::Stop)
        );
    }

    #[tokio::test]
    async fn passes_through_a_marked_final_without_synthesizing_another() {
        let source = VecDeltaStream::new(vec![
            Ok(StreamDelta::text("done")),
            Ok(StreamDelta::finish(FinishReason::Length)),
        ]);

        let (deltas, terminal) =
            collect(multiplex(Box::pin(source), CancellationToken::new())).await;

        assert!(terminal.is_none());
        let finals = deltas.iter().filter(|delta| delta.is_final).count();
        assert_eq!(finals, 1);
        assert_eq!(
            deltas.last().and_then(|delta| delta.finish),
            Some(FinishReason::Length)
        );
    }

    #[tokio::test]
    async fn stops_pulling_after_the_first_final_delta() {
        let source = VecDeltaStream::new(vec![
            Ok(StreamDelta::finish(FinishReason::Stop)),
            Ok(StreamDelta::text("late")),
        ]);

        let (deltas, terminal) =
            collect(multiplex(Box::pin(source), CancellationToken::new())).await;

        assert!(terminal.is_none());
        assert_eq!(deltas.len(), 1);
        assert!(deltas[0].is_final);
    }

    #[tokio::test]
    async fn mid_stream_error_is_terminal_after_delivered_deltas() {
        let source = VecDeltaStream::new(vec![
            Ok(StreamDelta::text("partial ")),
            Err(VendorError::fault("connection reset")),
            Ok(StreamDelta::text("never seen")),
        ]);

        let (deltas, terminal) =
            collect(multiplex(Box::pin(source), CancellationToken::new())).await;

        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].text, "partial ");
        assert!(deltas.iter().all(|delta| !delta.is_final));

        let terminal = terminal.expect("error must be terminal");
        assert_eq!(terminal.kind, VendorErrorKind::VendorFault);
    }

    #[tokio::test]
    async fn cancellation_drops_the_source_and_terminates_with_canceled() {
        let closed = Arc::new(AtomicBool::new(false));

        struct ConnectionGuard(Arc<AtomicBool>);

        impl Drop for ConnectionGuard {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let source = {
            let closed = Arc::clone(&closed);
            async_stream::stream! {
                let _guard = ConnectionGuard(closed);
                yield Ok(StreamDelta::text("first"));
                futures_util::future::pending::<()>().await;
                yield Ok(StreamDelta::text("unreachable"));
            }
        };

        let cancel = CancellationToken::new();
        let mut stream = multiplex(Box::pin(source), cancel.clone());

        let first = stream
            .next()
            .await
            .expect("first delta exists")
            .expect("first delta is ok");
        assert_eq!(first.text, "first");
        assert!(!closed.load(Ordering::SeqCst));

        cancel.cancel();

        let terminal = stream
            .next()
            .await
            .expect("terminal item exists")
            .expect_err("terminal item is the canceled error");
        assert_eq!(terminal.kind, VendorErrorKind::Canceled);
        assert!(
            closed.load(Ordering::SeqCst),
            "underlying connection must report itself closed"
        );

        assert!(stream.next().await.is_none());
    }
}
