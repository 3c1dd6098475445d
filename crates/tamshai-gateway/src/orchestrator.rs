use std::time::Instant;

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tamshai_auth::prelude::{AccessPartition, ServerConfig};
use tamshai_llm::prelude::AnswerRequest;
use tamshai_llm::prompt::data_sources;
use tamshai_net::prelude::QueryRequest;
use tamshai_types::prelude::{
    CallerIdentity, ConfirmationData, CorrelationId, QueryOutcome, QueryStatus, ResponseEnvelope,
};
use tracing::{debug, info, warn};

use crate::confirm::register_pending;
use crate::errors::ApiError;
use crate::state::AppState;

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Queries every server concurrently and waits for all of them. Each call is
/// raced against the orchestration bound; the result is in `servers` order.
pub async fn fan_out(
    state: &AppState,
    servers: &[&ServerConfig],
    caller: &CallerIdentity,
    request: &QueryRequest,
) -> Vec<QueryOutcome> {
    let bound = state.query_timeout();
    let calls = servers.iter().map(|server| {
        let request = request.clone();
        async move {
            let started = Instant::now();
            match tokio::time::timeout(bound, state.client.query_server(server, caller, request))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => QueryOutcome::timeout(
                    &server.name,
                    format!("no answer within the {}ms query bound", bound.as_millis()),
                    elapsed_ms(started),
                ),
            }
        }
    });
    let outcomes = join_all(calls).await;
    for outcome in &outcomes {
        if outcome.is_success() {
            debug!(target: "tamshai::orchestrator", server = %outcome.server, duration_ms = outcome.duration_ms, "server answered");
        } else {
            warn!(
                target: "tamshai::orchestrator",
                server = %outcome.server,
                status = outcome.status.as_str(),
                duration_ms = outcome.duration_ms,
                "server degraded: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    outcomes
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Warning {
    pub server: String,
    pub status: QueryStatus,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServerCursor {
    pub server: String,
    pub cursor: String,
}

/// Write intent surfaced by one of the servers.
#[derive(Clone, Debug)]
pub struct PendingIntent {
    pub server: String,
    pub confirmation_id: String,
    pub message: String,
    pub data: ConfirmationData,
}

/// Outcomes of one fan-out, kept in registry order.
#[derive(Clone, Debug, Default)]
pub struct Aggregation {
    outcomes: Vec<QueryOutcome>,
}

impl Aggregation {
    pub fn new(outcomes: Vec<QueryOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[QueryOutcome] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &QueryOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &QueryOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    pub fn successful_servers(&self) -> Vec<String> {
        self.succeeded().map(|o| o.server.clone()).collect()
    }

    pub fn failed_servers(&self) -> Vec<String> {
        self.failed().map(|o| o.server.clone()).collect()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.failed()
            .map(|o| Warning {
                server: o.server.clone(),
                status: o.status,
                message: o.error.clone().unwrap_or_else(|| "unknown error".into()),
            })
            .collect()
    }

    /// First pending confirmation, in registry order.
    pub fn pending(&self) -> Option<PendingIntent> {
        self.succeeded().find_map(|o| match o.envelope()? {
            ResponseEnvelope::PendingConfirmation {
                confirmation_id,
                message,
                confirmation_data,
            } => Some(PendingIntent {
                server: o.server.clone(),
                confirmation_id,
                message,
                data: confirmation_data,
            }),
            _ => None,
        })
    }

    /// Cursors of servers that stopped with more data available.
    pub fn cursors(&self) -> Vec<ServerCursor> {
        self.succeeded()
            .filter_map(|o| {
                let envelope = o.envelope()?;
                let cursor = envelope.pagination()?.next_page()?.to_string();
                Some(ServerCursor {
                    server: o.server.clone(),
                    cursor,
                })
            })
            .collect()
    }

    pub fn pagination_hint(&self) -> Option<String> {
        self.succeeded()
            .filter_map(|o| o.envelope()?.pagination()?.hint.clone())
            .next()
    }

    /// Serialised data of every successful server under a `[Data from x]`
    /// label. Deterministic for identical upstream data.
    pub fn build_context(&self) -> String {
        self.succeeded()
            .filter_map(render_block)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_block(outcome: &QueryOutcome) -> Option<String> {
    let envelope = outcome.envelope();
    let (payload, notice) = match &envelope {
        Some(ResponseEnvelope::PendingConfirmation { .. }) => return None,
        Some(env @ ResponseEnvelope::Success { data, .. }) => (data, completeness_notice(&outcome.server, env)),
        _ => (&outcome.data, None),
    };
    let payload = serde_json::to_string(payload).unwrap_or_else(|_| "null".into());
    let mut block = format!("[Data from {}]\n{payload}\n", outcome.server);
    if let Some(notice) = notice {
        block.push_str(&notice);
        block.push('\n');
    }
    Some(block)
}

fn completeness_notice(server: &str, envelope: &ResponseEnvelope) -> Option<String> {
    if let Some(meta) = envelope.pagination().filter(|m| m.has_more) {
        let hint = meta.hint.as_deref().map(|h| format!(" {h}")).unwrap_or_default();
        return Some(format!(
            "[Incomplete: {server} returned {} records and has more available.{hint}]",
            meta.returned_count
        ));
    }
    if let Some(meta) = envelope.truncation().filter(|m| m.truncated) {
        let total = meta
            .total_count
            .as_ref()
            .map(|t| match t {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "more".into());
        let warning = meta.warning.as_deref().map(|w| format!(" {w}")).unwrap_or_default();
        return Some(format!(
            "[Incomplete: {server} returned {} of {total} records.{warning}]",
            meta.returned_count
        ));
    }
    None
}

/// Context for one request: reused from the cache, or freshly aggregated.
#[derive(Clone, Debug)]
pub enum Gathered {
    Cached(String),
    Fresh(Aggregation),
}

impl Gathered {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Gathered::Cached(_))
    }
}

/// Cache-or-fetch. With `use_cache` false the cache is not consulted at all.
pub async fn gather(
    state: &AppState,
    caller: &CallerIdentity,
    servers: &[&ServerConfig],
    request: &QueryRequest,
    use_cache: bool,
) -> Gathered {
    if use_cache {
        if let Some(context) = state.context_cache.get(&caller.user_id).await {
            debug!(target: "tamshai::orchestrator", user_id = %caller.user_id, "using cached context");
            return Gathered::Cached(context);
        }
    }
    Gathered::Fresh(Aggregation::new(
        fan_out(state, servers, caller, request).await,
    ))
}

/// Detached write of a fresh context. Partial or intent-bearing aggregations
/// are not cached.
pub fn remember_context(state: &AppState, caller: &CallerIdentity, aggregation: &Aggregation, context: &str) {
    if aggregation.has_failures() || aggregation.pending().is_some() {
        return;
    }
    state
        .context_cache
        .spawn_store(caller.user_id.clone(), context.to_string());
}

#[derive(Clone, Debug)]
pub struct QueryInput {
    pub query: String,
    pub conversation_id: Option<String>,
    pub force_refresh: bool,
}

impl QueryInput {
    pub fn from_body(body: &Value) -> Result<Self, ApiError> {
        let query = body
            .get("query")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ApiError::invalid_request("Field 'query' is required and must be a non-empty string."))?;
        let conversation_id = match body.get("conversationId") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(_) => return Err(ApiError::invalid_request("Field 'conversationId' must be a string.")),
        };
        let force_refresh = match body.get("forceRefresh") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => return Err(ApiError::invalid_request("Field 'forceRefresh' must be a boolean.")),
        };
        Ok(Self {
            query: query.to_string(),
            conversation_id,
            force_refresh,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Success,
    Partial,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    pub data_sources_queried: Vec<String>,
    pub data_sources_failed: Vec<String>,
    pub processing_time_ms: u64,
    pub cache_hit: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiQueryResponse {
    pub request_id: String,
    pub conversation_id: String,
    pub response: String,
    pub status: AnswerStatus,
    pub metadata: QueryMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<Warning>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_confirmation: Option<Value>,
}

/// Non-streaming query: access filter, cache-or-fan-out, answer generation.
/// Per-server failures become warnings; only generator or store failures
/// fail the request.
pub async fn orchestrate(
    state: &AppState,
    caller: &CallerIdentity,
    input: QueryInput,
    request_id: &str,
) -> Result<AiQueryResponse, ApiError> {
    let started = Instant::now();
    let access = AccessPartition::resolve(&caller.roles, &state.registry);
    let conversation_id = input
        .conversation_id
        .clone()
        .unwrap_or_else(|| CorrelationId::new_random().0);

    let gathered = gather(
        state,
        caller,
        &access.accessible,
        &QueryRequest::new(&input.query),
        !input.force_refresh,
    )
    .await;

    let (context, queried, failed, warnings) = match &gathered {
        Gathered::Cached(context) => (
            context.clone(),
            data_sources(context).into_iter().map(str::to_string).collect(),
            Vec::new(),
            Vec::new(),
        ),
        Gathered::Fresh(aggregation) => {
            if let Some(intent) = aggregation.pending() {
                let envelope = register_pending(state, caller, &intent, request_id).await?;
                info!(
                    target: "tamshai::orchestrator",
                    request_id,
                    user_id = %caller.user_id,
                    server = %intent.server,
                    "write action awaiting confirmation"
                );
                return Ok(AiQueryResponse {
                    request_id: request_id.to_string(),
                    conversation_id,
                    response: intent.message.clone(),
                    status: status_for(aggregation),
                    metadata: QueryMetadata {
                        data_sources_queried: aggregation.successful_servers(),
                        data_sources_failed: aggregation.failed_servers(),
                        processing_time_ms: elapsed_ms(started),
                        cache_hit: false,
                    },
                    warnings: non_empty(aggregation.warnings()),
                    pending_confirmation: Some(envelope),
                });
            }
            let context = aggregation.build_context();
            remember_context(state, caller, aggregation, &context);
            (
                context,
                aggregation.successful_servers(),
                aggregation.failed_servers(),
                aggregation.warnings(),
            )
        }
    };

    let answer_request = AnswerRequest::new(&input.query, context, caller.clone())
        .with_conversation(Some(conversation_id.clone()));
    let response = state
        .generator
        .answer(&answer_request)
        .await
        .map_err(|err| {
            let mut obj = err.into_inner();
            obj.details = Some(serde_json::json!({ "requestId": request_id }));
            ApiError::new(obj)
        })?;

    let status = if failed.is_empty() {
        AnswerStatus::Success
    } else {
        AnswerStatus::Partial
    };
    let processing_time_ms = elapsed_ms(started);
    info!(
        target: "tamshai::orchestrator",
        request_id,
        user_id = %caller.user_id,
        cache_hit = gathered.is_cache_hit(),
        failed = failed.len(),
        duration_ms = processing_time_ms,
        "query answered"
    );

    Ok(AiQueryResponse {
        request_id: request_id.to_string(),
        conversation_id,
        response,
        status,
        metadata: QueryMetadata {
            data_sources_queried: queried,
            data_sources_failed: failed,
            processing_time_ms,
            cache_hit: gathered.is_cache_hit(),
        },
        warnings: non_empty(warnings),
        pending_confirmation: None,
    })
}

fn status_for(aggregation: &Aggregation) -> AnswerStatus {
    if aggregation.has_failures() {
        AnswerStatus::Partial
    } else {
        AnswerStatus::Success
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
