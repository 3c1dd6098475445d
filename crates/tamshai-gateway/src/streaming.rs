use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, Sse};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tamshai_auth::prelude::AccessPartition;
use tamshai_llm::prelude::AnswerRequest;
use tamshai_net::prelude::QueryRequest;
use tamshai_types::prelude::CallerIdentity;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::confirm::register_pending;
use crate::orchestrator::{gather, remember_context, Gathered, ServerCursor, Warning};
use crate::state::AppState;

pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Frame {
    Text {
        text: String,
    },
    ServiceUnavailable {
        warnings: Vec<Warning>,
        successful_servers: Vec<String>,
        failed_servers: Vec<String>,
    },
    Pagination {
        has_more: bool,
        cursors: Vec<ServerCursor>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
    Error {
        message: String,
    },
    /// Pre-serialised pending-confirmation envelope, emitted as is.
    #[serde(skip)]
    Pending(Value),
    #[serde(skip)]
    Heartbeat,
    #[serde(skip)]
    Done,
}

impl Frame {
    pub fn into_event(self) -> Event {
        match self {
            Frame::Done => Event::default().data(DONE_SENTINEL),
            Frame::Heartbeat => Event::default().comment("heartbeat"),
            Frame::Pending(envelope) => Event::default().data(envelope.to_string()),
            frame => {
                let payload = serde_json::to_string(&frame)
                    .unwrap_or_else(|_| "{\"type\":\"error\",\"message\":\"encoding failed\"}".into());
                Event::default().data(payload)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct StreamRequest {
    pub query: String,
    pub cursor: Option<String>,
    pub request_id: String,
}

struct FrameSink {
    tx: mpsc::Sender<Frame>,
}

impl FrameSink {
    /// False once the receiving side is gone.
    async fn send(&self, frame: Frame) -> bool {
        self.tx.send(frame).await.is_ok()
    }

    async fn finish(&self, frame: Frame) {
        if self.send(frame).await {
            self.send(Frame::Done).await;
        }
    }
}

/// Produces the frames of one streaming query into `tx`. Returns early as
/// soon as `cancel` fires; generation is never started on a cancelled
/// request.
pub async fn run_stream(
    state: AppState,
    caller: CallerIdentity,
    request: StreamRequest,
    tx: mpsc::Sender<Frame>,
    cancel: CancellationToken,
) {
    let sink = FrameSink { tx };
    let access = AccessPartition::resolve(&caller.roles, &state.registry);
    let query = QueryRequest::new(&request.query).with_cursor(request.cursor.clone());

    let gathered = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(target: "tamshai::stream", user_id = %caller.user_id, "caller left during fan-out");
            return;
        }
        gathered = gather(&state, &caller, &access.accessible, &query, request.cursor.is_none()) => gathered,
    };

    let (context, aggregation) = match gathered {
        Gathered::Cached(context) => (context, None),
        Gathered::Fresh(aggregation) => {
            if let Some(intent) = aggregation.pending() {
                match register_pending(&state, &caller, &intent, &request.request_id).await {
                    Ok(envelope) => sink.finish(Frame::Pending(envelope)).await,
                    Err(err) => {
                        sink.finish(Frame::Error {
                            message: err.0.message_user.clone(),
                        })
                        .await
                    }
                }
                return;
            }
            if aggregation.has_failures() {
                let notice = Frame::ServiceUnavailable {
                    warnings: aggregation.warnings(),
                    successful_servers: aggregation.successful_servers(),
                    failed_servers: aggregation.failed_servers(),
                };
                if !sink.send(notice).await {
                    return;
                }
                if aggregation.succeeded().next().is_none() {
                    warn!(target: "tamshai::stream", user_id = %caller.user_id, "every accessible server failed");
                    sink.send(Frame::Done).await;
                    return;
                }
            }
            let context = aggregation.build_context();
            remember_context(&state, &caller, &aggregation, &context);
            (context, Some(aggregation))
        }
    };

    if cancel.is_cancelled() {
        debug!(target: "tamshai::stream", user_id = %caller.user_id, "caller left before generation");
        return;
    }

    let answer_request = AnswerRequest::new(&request.query, context, caller.clone());
    let mut chunks = match state.generator.answer_stream(answer_request).await {
        Ok(chunks) => chunks,
        Err(err) => {
            warn!(target: "tamshai::stream", user_id = %caller.user_id, "generation failed: {err}");
            sink.finish(Frame::Error {
                message: err.0.message_user.clone(),
            })
            .await;
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(target: "tamshai::stream", user_id = %caller.user_id, "caller left during generation");
                return;
            }
            next = chunks.next() => next,
        };
        match next {
            Some(Ok(text)) => {
                if !sink.send(Frame::Text { text }).await {
                    return;
                }
            }
            Some(Err(err)) => {
                warn!(target: "tamshai::stream", user_id = %caller.user_id, "generation stream failed: {err}");
                sink.finish(Frame::Error {
                    message: err.0.message_user.clone(),
                })
                .await;
                return;
            }
            None => break,
        }
    }

    if let Some(aggregation) = &aggregation {
        let cursors = aggregation.cursors();
        if !cursors.is_empty() {
            let frame = Frame::Pagination {
                has_more: true,
                cursors,
                hint: aggregation.pagination_hint(),
            };
            if !sink.send(frame).await {
                return;
            }
        }
    }
    sink.send(Frame::Done).await;
    info!(target: "tamshai::stream", user_id = %caller.user_id, cache_hit = aggregation.is_none(), "stream completed");
}

/// Comment frames on a fixed interval until `done` fires or the receiver
/// goes away.
pub fn spawn_heartbeat(
    tx: mpsc::Sender<Frame>,
    every: Duration,
    done: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        loop {
            tokio::select! {
                _ = done.cancelled() => break,
                _ = ticker.tick() => {
                    if tx.send(Frame::Heartbeat).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Wires a streaming query to an SSE body. Dropping the body (caller
/// disconnect) cancels the producer and the heartbeat.
pub fn sse_response(
    state: AppState,
    caller: CallerIdentity,
    request: StreamRequest,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Frame>(32);
    let cancel = CancellationToken::new();
    let done = cancel.child_token();

    if let Some(every) = state.heartbeat() {
        spawn_heartbeat(tx.clone(), every, done.clone());
    }
    let producer_cancel = cancel.clone();
    tokio::spawn(async move {
        run_stream(state, caller, request, tx, producer_cancel).await;
        done.cancel();
    });

    let guard = cancel.drop_guard();
    let body = async_stream::stream! {
        let _guard = guard;
        let frames = until_done(rx);
        tokio::pin!(frames);
        while let Some(frame) = frames.next().await {
            yield Ok::<Event, Infallible>(frame.into_event());
        }
    };
    Sse::new(body)
}

/// Frames up to and including `Done`. A heartbeat that lands after the
/// sentinel is never written.
fn until_done(mut rx: mpsc::Receiver<Frame>) -> impl Stream<Item = Frame> {
    async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            let last = matches!(frame, Frame::Done);
            yield frame;
            if last {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::*;
    use crate::testing::{alice, bob, Script, TestHarness};

    fn request(query: &str) -> StreamRequest {
        StreamRequest {
            query: query.into(),
            cursor: None,
            request_id: "req-s".into(),
        }
    }

    async fn collect(harness: &TestHarness, caller: CallerIdentity, cursor: Option<&str>) -> Vec<Frame> {
        let (tx, mut rx) = mpsc::channel(64);
        run_stream(
            harness.state.clone(),
            caller,
            StreamRequest {
                query: "how many people?".into(),
                cursor: cursor.map(str::to_string),
                request_id: "req-s".into(),
            },
            tx,
            CancellationToken::new(),
        )
        .await;
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn cancelled_stream_never_generates() {
        let harness = TestHarness::new()
            .script("hr", Script::Data(json!({"status": "success", "data": [1]})));
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();
        run_stream(
            harness.state.clone(),
            alice(),
            request("q"),
            tx,
            cancel,
        )
        .await;
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn cancel_during_slow_fan_out_never_generates() {
        let harness = TestHarness::new().script(
            "hr",
            Script::Delayed(200, json!({"status": "success", "data": [1]})),
        );
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let producer = tokio::spawn(run_stream(
            harness.state.clone(),
            alice(),
            request("q"),
            tx,
            cancel.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        producer.await.unwrap();

        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn cancel_mid_generation_stops_without_done() {
        let harness = TestHarness::new()
            .script("hr", Script::Data(json!({"status": "success", "data": [1]})));
        harness.generator.set_chunk_delay(Duration::from_millis(100));
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let producer = tokio::spawn(run_stream(
            harness.state.clone(),
            alice(),
            request("how many people?"),
            tx,
            cancel.clone(),
        ));
        assert!(matches!(rx.recv().await, Some(Frame::Text { .. })));
        cancel.cancel();
        producer.await.unwrap();

        let mut rest = Vec::new();
        while let Some(frame) = rx.recv().await {
            rest.push(frame);
        }
        assert!(rest.iter().all(|f| matches!(f, Frame::Text { .. })), "{rest:?}");
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn body_ends_at_done_sentinel() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(Frame::Text { text: "hi".into() }).await.unwrap();
        tx.send(Frame::Done).await.unwrap();
        tx.send(Frame::Heartbeat).await.unwrap();
        let frames: Vec<Frame> = until_done(rx).collect().await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[1], Frame::Done));
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn text_then_done() {
        let harness = TestHarness::new()
            .script("hr", Script::Data(json!({"status": "success", "data": [1]})));
        let frames = collect(&harness, alice(), None).await;
        assert!(frames.len() >= 2);
        assert!(matches!(frames[0], Frame::Text { .. }));
        assert!(matches!(frames.last(), Some(Frame::Done)));
        let text: String = frames
            .iter()
            .filter_map(|f| match f {
                Frame::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(text.starts_with("Question from alice: how many people?"));
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn degradation_notice_precedes_text() {
        let harness = TestHarness::new()
            .script("hr", Script::Data(json!({"status": "success", "data": [1]})))
            .script("finance", Script::Fail("boom".into()));
        let frames = collect(&harness, bob(), None).await;
        match &frames[0] {
            Frame::ServiceUnavailable {
                successful_servers,
                failed_servers,
                warnings,
            } => {
                assert_eq!(successful_servers, &vec!["hr".to_string(), "sales".to_string()]);
                assert_eq!(failed_servers, &vec!["finance".to_string()]);
                assert_eq!(warnings[0].message, "boom");
            }
            other => panic!("unexpected first frame {other:?}"),
        }
        assert!(matches!(frames[1], Frame::Text { .. }));
    }

    #[tokio::test]
    async fn pending_confirmation_short_circuits() {
        let harness = TestHarness::new().script(
            "hr",
            Script::Data(json!({
                "status": "pending_confirmation",
                "confirmationId": "conf-9",
                "message": "Update salary?",
                "confirmationData": {"action": "update_salary", "targetServer": "hr"}
            })),
        );
        let frames = collect(&harness, alice(), None).await;
        assert_eq!(frames.len(), 2);
        match &frames[0] {
            Frame::Pending(envelope) => {
                assert_eq!(envelope["status"], "pending_confirmation");
                assert_eq!(envelope["confirmationId"], "conf-9");
            }
            other => panic!("unexpected frame {other:?}"),
        }
        assert!(matches!(frames[1], Frame::Done));
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
        assert!(harness.state.confirmations.get("conf-9").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn pagination_frame_comes_before_done() {
        let harness = TestHarness::new().script(
            "hr",
            Script::Data(json!({
                "status": "success",
                "data": [1, 2],
                "metadata": {"hasMore": true, "nextCursor": "c2", "returnedCount": 2}
            })),
        );
        let frames = collect(&harness, alice(), None).await;
        let n = frames.len();
        match &frames[n - 2] {
            Frame::Pagination { cursors, .. } => assert_eq!(cursors[0].cursor, "c2"),
            other => panic!("unexpected frame {other:?}"),
        }
        assert!(matches!(frames[n - 1], Frame::Done));
    }

    #[tokio::test]
    async fn every_server_failing_skips_generation() {
        let harness = TestHarness::new().script("hr", Script::Timeout);
        let frames = collect(&harness, alice(), None).await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], Frame::ServiceUnavailable { .. }));
        assert!(matches!(frames[1], Frame::Done));
        assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn heartbeat_stops_when_done_fires() {
        let (tx, mut rx) = mpsc::channel(8);
        let done = CancellationToken::new();
        let handle = spawn_heartbeat(tx, Duration::from_millis(10), done.clone());
        assert!(matches!(rx.recv().await, Some(Frame::Heartbeat)));
        done.cancel();
        handle.await.unwrap();
        while rx.recv().await.is_some() {}
    }

    #[test]
    fn frames_serialise_with_type_tag() {
        let frame = Frame::Pagination {
            has_more: true,
            cursors: vec![ServerCursor {
                server: "hr".into(),
                cursor: "c2".into(),
            }],
            hint: None,
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"type": "pagination", "hasMore": true, "cursors": [{"server": "hr", "cursor": "c2"}]})
        );
        assert_eq!(
            serde_json::to_value(Frame::Text { text: "hi".into() }).unwrap(),
            json!({"type": "text", "text": "hi"})
        );
    }
}
