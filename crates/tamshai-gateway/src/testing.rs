//! In-process fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tamshai_auth::prelude::{ServerConfig, ServerRegistry};
use tamshai_cache::prelude::MemoryKv;
use tamshai_llm::prelude::{
    AnswerGenerator, AnswerRequest, AnswerStream, EchoGenerator, LlmError,
};
use tamshai_net::prelude::{NetError, QueryClient, QueryRequest, ToolCall, ToolResponse};
use tamshai_types::prelude::{CallerIdentity, QueryOutcome};
use url::Url;

use crate::config::GatewayConfig;
use crate::state::AppState;

pub fn alice() -> CallerIdentity {
    CallerIdentity::new("u-alice", "alice").with_roles(["hr-read", "hr-write"])
}

pub fn bob() -> CallerIdentity {
    CallerIdentity::new("u-bob", "bob").with_roles(["executive"])
}

#[derive(Clone)]
pub enum Script {
    Data(Value),
    Delayed(u64, Value),
    Timeout,
    Fail(String),
    Hang,
}

#[derive(Default)]
pub struct ScriptedClient {
    script: HashMap<String, Script>,
    pub queries: AtomicUsize,
    tools: Mutex<Vec<(String, ToolCall)>>,
    executes: Mutex<Vec<(String, String, Value)>>,
    pub tool_reply: Mutex<Option<Result<ToolResponse, ()>>>,
}

impl ScriptedClient {
    pub fn executed(&self) -> Vec<(String, String, Value)> {
        self.executes.lock().unwrap().clone()
    }

    pub fn tool_calls(&self) -> Vec<(String, ToolCall)> {
        self.tools.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryClient for ScriptedClient {
    async fn query_server(
        &self,
        server: &ServerConfig,
        _caller: &CallerIdentity,
        _request: QueryRequest,
    ) -> QueryOutcome {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match self.script.get(&server.name).cloned() {
            Some(Script::Data(value)) => QueryOutcome::success(&server.name, value, 1),
            Some(Script::Delayed(ms, value)) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                QueryOutcome::success(&server.name, value, ms)
            }
            Some(Script::Timeout) => QueryOutcome::timeout(&server.name, "timed out after 5000ms", 5000),
            Some(Script::Fail(message)) => QueryOutcome::error(&server.name, message, 1),
            Some(Script::Hang) => std::future::pending().await,
            None => QueryOutcome::success(
                &server.name,
                serde_json::json!({"status": "success", "data": []}),
                1,
            ),
        }
    }

    async fn call_tool(
        &self,
        server: &ServerConfig,
        _caller: &CallerIdentity,
        call: ToolCall,
    ) -> Result<ToolResponse, NetError> {
        self.tools.lock().unwrap().push((server.name.clone(), call));
        match self.tool_reply.lock().unwrap().clone() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(())) => Err(NetError::unavailable(&server.name, "connection refused")),
            None => Ok(ToolResponse {
                status: 200,
                body: serde_json::json!({"status": "success", "data": []}),
            }),
        }
    }

    async fn execute(
        &self,
        server: &ServerConfig,
        _caller: &CallerIdentity,
        action: &str,
        payload: &Value,
    ) -> Result<Value, NetError> {
        self.executes
            .lock()
            .unwrap()
            .push((server.name.clone(), action.to_string(), payload.clone()));
        Ok(serde_json::json!({"status": "success", "data": {"done": true}}))
    }
}

/// Echo generator that counts invocations and remembers the last context.
#[derive(Default)]
pub struct CountingGenerator {
    inner: EchoGenerator,
    pub calls: AtomicUsize,
    last_context: Mutex<Option<String>>,
    chunk_delay_ms: AtomicU64,
}

impl CountingGenerator {
    pub fn last_context(&self) -> Option<String> {
        self.last_context.lock().unwrap().clone()
    }

    /// Holds back every streamed chunk by `delay`.
    pub fn set_chunk_delay(&self, delay: Duration) {
        self.chunk_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl AnswerGenerator for CountingGenerator {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn answer(&self, request: &AnswerRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = Some(request.context.clone());
        self.inner.answer(request).await
    }

    async fn answer_stream(&self, request: AnswerRequest) -> Result<AnswerStream, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = Some(request.context.clone());
        let chunks = self.inner.answer_stream(request).await?;
        let delay = Duration::from_millis(self.chunk_delay_ms.load(Ordering::SeqCst));
        if delay.is_zero() {
            return Ok(chunks);
        }
        Ok(chunks
            .then(move |chunk| async move {
                tokio::time::sleep(delay).await;
                chunk
            })
            .boxed())
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub client: Arc<ScriptedClient>,
    pub generator: Arc<CountingGenerator>,
    pub kv: Arc<MemoryKv>,
    script: HashMap<String, Script>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(HashMap::new())
    }

    /// Replaces the scripted answer for `server`, rebuilding the state.
    pub fn script(mut self, server: &str, script: Script) -> Self {
        self.script.insert(server.to_string(), script);
        Self::build(self.script)
    }

    fn build(script: HashMap<String, Script>) -> Self {
        let client = Arc::new(ScriptedClient {
            script: script.clone(),
            ..ScriptedClient::default()
        });
        let generator = Arc::new(CountingGenerator::default());
        let kv = Arc::new(MemoryKv::new(128));
        let mut config = GatewayConfig::default();
        config.timeouts.query_ms = 300;
        config.stream.heartbeat_ms = 0;
        let state = AppState::from_parts(
            config,
            registry(),
            client.clone(),
            generator.clone(),
            kv.clone(),
        );
        Self {
            state,
            client,
            generator,
            kv,
            script,
        }
    }
}

fn registry() -> ServerRegistry {
    let server = |name: &str, port: u16, roles: &[&str]| {
        ServerConfig::new(
            name,
            Url::parse(&format!("http://127.0.0.1:{port}")).unwrap(),
            roles.iter().copied(),
            &format!("{name} data"),
        )
    };
    ServerRegistry::new(vec![
        server("hr", 3101, &["hr-read", "executive"]),
        server("finance", 3102, &["finance-read", "executive"]),
        server("sales", 3103, &["sales-read", "executive"]),
    ])
    .unwrap()
}
