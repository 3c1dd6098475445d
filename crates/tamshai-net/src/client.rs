use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::HeaderMap;
use serde_json::{json, Value};
use tamshai_auth::prelude::{apply_identity_headers, ServerConfig};
use tamshai_types::prelude::{CallerIdentity, QueryOutcome};
use tracing::{debug, warn};

use crate::errors::NetError;
use crate::metrics::NetMetrics;
use crate::pagination::PageWalk;
use crate::policy::QueryPolicy;
use crate::types::{QueryRequest, ToolCall, ToolMethod, ToolResponse};

/// Everything the gateway asks of a domain server.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Never fails: transport and application failures become a
    /// `timeout`/`error` outcome.
    async fn query_server(
        &self,
        server: &ServerConfig,
        caller: &CallerIdentity,
        request: QueryRequest,
    ) -> QueryOutcome;

    async fn call_tool(
        &self,
        server: &ServerConfig,
        caller: &CallerIdentity,
        call: ToolCall,
    ) -> Result<ToolResponse, NetError>;

    async fn execute(
        &self,
        server: &ServerConfig,
        caller: &CallerIdentity,
        action: &str,
        payload: &Value,
    ) -> Result<Value, NetError>;
}

#[derive(Clone)]
pub struct HttpQueryClient {
    pub policy: QueryPolicy,
    pub client: reqwest::Client,
    pub metrics: NetMetrics,
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl HttpQueryClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn metrics(&self) -> &NetMetrics {
        &self.metrics
    }

    fn identity_headers(caller: &CallerIdentity) -> HeaderMap {
        let mut headers = HeaderMap::new();
        apply_identity_headers(caller, &mut headers);
        headers
    }

    fn map_send_error(&self, server: &ServerConfig, timeout: Duration, err: reqwest::Error) -> NetError {
        if err.is_timeout() {
            self.metrics.record_timeout();
            NetError::timeout(&server.name, u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
        } else if err.is_connect() {
            self.metrics.record_failure();
            NetError::unavailable(&server.name, &format!("connect error: {err}"))
        } else {
            self.metrics.record_failure();
            NetError::upstream(&server.name, &format!("request error: {err}"))
        }
    }

    /// Sends one request with `timeout` covering connect, headers and body.
    async fn send_json(
        &self,
        server: &ServerConfig,
        builder: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<(u16, Value), NetError> {
        self.metrics.record_request();
        let response = builder
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| self.map_send_error(server, timeout, err))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.map_send_error(server, timeout, err))?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|err| {
                self.metrics.record_failure();
                NetError::upstream(&server.name, &format!("response is not JSON: {err}"))
            })?
        };
        Ok((status, body))
    }

    async fn fetch_page(
        &self,
        server: &ServerConfig,
        caller: &CallerIdentity,
        query: &str,
        cursor: Option<&str>,
        timeout: Duration,
    ) -> Result<Value, NetError> {
        let url = server
            .endpoint("query")
            .map_err(|err| NetError::schema(&format!("query url for {}: {err}", server.name)))?;
        let builder = self
            .client
            .post(url)
            .headers(Self::identity_headers(caller))
            .json(&json!({
                "query": query,
                "userContext": caller,
                "cursor": cursor,
            }));
        let (status, body) = self.send_json(server, builder, timeout).await?;
        if !(200..300).contains(&status) {
            self.metrics.record_failure();
            return Err(NetError::upstream_status(&server.name, status, body));
        }
        self.metrics.record_page();
        Ok(body)
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn query_server(
        &self,
        server: &ServerConfig,
        caller: &CallerIdentity,
        request: QueryRequest,
    ) -> QueryOutcome {
        let started = Instant::now();
        let timeout = self.policy.timeout_for(request.is_write);

        let first = match self
            .fetch_page(server, caller, &request.query, request.cursor.as_deref(), timeout)
            .await
        {
            Ok(body) => body,
            Err(err) => {
                let duration_ms = elapsed_ms(started);
                warn!(target: "tamshai::net", server = %server.name, duration_ms, "query failed: {err}");
                return if err.is_timeout() {
                    QueryOutcome::timeout(
                        &server.name,
                        format!("timed out after {}ms", timeout.as_millis()),
                        duration_ms,
                    )
                } else {
                    QueryOutcome::error(&server.name, err.0.message_user.clone(), duration_ms)
                };
            }
        };

        let Some(mut walk) = PageWalk::begin(&first) else {
            return QueryOutcome::success(&server.name, first, elapsed_ms(started));
        };

        if request.auto_paginate {
            while let Some(cursor) = walk.next_cursor(self.policy.max_pages) {
                let page = match self
                    .fetch_page(server, caller, &request.query, Some(&cursor), timeout)
                    .await
                {
                    Ok(page) => page,
                    Err(err) => {
                        warn!(target: "tamshai::net", server = %server.name, "page {} failed; returning partial pages: {err}", walk.pages() + 1);
                        break;
                    }
                };
                if !walk.absorb(&page) {
                    warn!(target: "tamshai::net", server = %server.name, "page {} is not an array result; stopping", walk.pages() + 1);
                    break;
                }
                debug!(target: "tamshai::net", server = %server.name, pages = walk.pages(), items = walk.len(), "page absorbed");
            }
        }

        QueryOutcome::success(&server.name, walk.finish(), elapsed_ms(started))
    }

    async fn call_tool(
        &self,
        server: &ServerConfig,
        caller: &CallerIdentity,
        call: ToolCall,
    ) -> Result<ToolResponse, NetError> {
        let url = server
            .endpoint(&format!("tools/{}", call.tool))
            .map_err(|err| NetError::schema(&format!("tool url for {}: {err}", server.name)))?;
        let timeout = self.policy.timeout_for(call.is_write());
        let builder = match &call.method {
            ToolMethod::Get(params) => self.client.get(url).query(params),
            ToolMethod::Post(body) => self.client.post(url).json(body),
        }
        .headers(Self::identity_headers(caller));

        let (status, body) = self.send_json(server, builder, timeout).await?;
        debug!(target: "tamshai::net", server = %server.name, tool = %call.tool, status, "tool call returned");
        Ok(ToolResponse { status, body })
    }

    async fn execute(
        &self,
        server: &ServerConfig,
        caller: &CallerIdentity,
        action: &str,
        payload: &Value,
    ) -> Result<Value, NetError> {
        let url = server
            .endpoint("execute")
            .map_err(|err| NetError::schema(&format!("execute url for {}: {err}", server.name)))?;
        let builder = self
            .client
            .post(url)
            .headers(Self::identity_headers(caller))
            .json(&json!({
                "action": action,
                "data": payload,
                "userContext": caller,
            }));
        let (status, body) = self
            .send_json(server, builder, self.policy.write_timeout)
            .await?;
        if !(200..300).contains(&status) {
            self.metrics.record_failure();
            return Err(NetError::upstream_status(&server.name, status, body));
        }
        Ok(body)
    }
}

#[derive(Default)]
pub struct ClientBuilder {
    policy: QueryPolicy,
    metrics: NetMetrics,
    client: Option<reqwest::Client>,
}

impl ClientBuilder {
    pub fn with_policy(mut self, policy: QueryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_metrics(mut self, metrics: NetMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<HttpQueryClient, NetError> {
        let client = match self.client {
            Some(client) => client,
            None => build_reqwest_client(&self.policy)?,
        };
        Ok(HttpQueryClient {
            policy: self.policy,
            client,
            metrics: self.metrics,
        })
    }
}

fn build_reqwest_client(policy: &QueryPolicy) -> Result<reqwest::Client, NetError> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .tcp_keepalive(Some(Duration::from_secs(30)))
        .connect_timeout(policy.connect_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|err| NetError::schema(&format!("failed to build reqwest client: {err}")))
}
