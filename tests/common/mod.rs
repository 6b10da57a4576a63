//! Shared fakes for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing_subscriber::{EnvFilter, fmt};

use taskpilot::mcp::ClientRef;
use taskpilot::{
    ActionCacheEntry, ActionContext, ActionFn, ActionOutcome, ActionRef, ActorHandle,
    ActorProvider, ClientFactory, Connection, Engine, EngineConfig, Rejection,
    RunContext, ServerConfig, ServerInfo, TaskOutput, TaskRunner, ToolServerClient,
    TransportError,
};

static INIT: Once = Once::new();

/// Captured per-test tracing; enable with e.g. `RUST_LOG=debug`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

pub fn actor() -> ActorHandle {
    Arc::new(())
}

pub fn noop_action(kind: &'static str) -> ActionRef {
    ActionFn::new(kind, |_ctx: ActionContext, _params: serde_json::Value| async move {
        ActionOutcome::ok("noop")
    })
    .into_ref()
}

pub fn step(index: u32, kind: &str) -> ActionCacheEntry {
    ActionCacheEntry::new(index, kind).with_outcome(true, "ok")
}

/// Runner that parks until released, then reports success with a one-step trace.
#[derive(Default)]
pub struct GatedRunner {
    pub release: Arc<Notify>,
    pub started: Arc<Notify>,
    pub calls: AtomicUsize,
}

impl GatedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl TaskRunner for GatedRunner {
    async fn run(&self, ctx: RunContext) -> Result<TaskOutput, Rejection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(TaskOutput::completed(format!("late success: {}", ctx.task.instruction()))
            .with_trace(vec![step(0, "click")]))
    }
}

/// Provider counting starts and closes.
#[derive(Default)]
pub struct CountingProvider {
    pub started: AtomicUsize,
    pub closed: AtomicUsize,
}

#[async_trait]
impl ActorProvider for CountingProvider {
    async fn start(&self) -> anyhow::Result<ActorHandle> {
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(actor())
    }

    async fn close(&self, _handle: ActorHandle) -> anyhow::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Tool-server client driven by a script of `id hint → tools`.
///
/// A config whose hint is not scripted fails to connect.
#[derive(Default)]
pub struct RecordingClient {
    pub tools: HashMap<String, Vec<&'static str>>,
    pub connected: Mutex<Vec<String>>,
    pub disconnects: Mutex<Vec<String>>,
    pub disconnect_all_calls: AtomicUsize,
}

impl RecordingClient {
    pub fn with_server(mut self, id: &str, tools: Vec<&'static str>) -> Self {
        self.tools.insert(id.to_string(), tools);
        self
    }

    pub fn disconnects_of(&self, id: &str) -> usize {
        self.disconnects.lock().unwrap().iter().filter(|d| *d == id).count()
    }

    pub fn total_disconnects(&self) -> usize {
        self.disconnects.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolServerClient for RecordingClient {
    async fn connect(&self, config: &ServerConfig) -> Result<Connection, TransportError> {
        let id = config.id_hint.clone().unwrap_or_default();
        let Some(tools) = self.tools.get(&id) else {
            return Err(TransportError::Connect(format!("no such server {id}")));
        };
        self.connected.lock().unwrap().push(id.clone());
        Ok(Connection {
            server_id: id,
            actions: tools.iter().copied().map(noop_action).collect(),
        })
    }

    async fn disconnect(&self, server_id: &str) -> Result<(), TransportError> {
        self.disconnects.lock().unwrap().push(server_id.to_string());
        self.connected.lock().unwrap().retain(|c| c != server_id);
        Ok(())
    }

    async fn disconnect_all(&self) -> Result<(), TransportError> {
        self.disconnect_all_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.lock().unwrap().clear();
        Ok(())
    }

    fn list_server_ids(&self) -> Vec<String> {
        self.connected.lock().unwrap().clone()
    }

    fn list_server_info(&self) -> Vec<ServerInfo> {
        self.list_server_ids()
            .into_iter()
            .map(|id| ServerInfo {
                tools: self.tools.get(&id).map(|t| t.iter().map(|s| s.to_string()).collect()).unwrap_or_default(),
                name: Some(format!("{id} server")),
                id,
            })
            .collect()
    }
}

/// Factory that hands out one shared client and counts creations.
pub struct SharedFactory {
    pub client: Arc<RecordingClient>,
    pub created: AtomicUsize,
}

impl SharedFactory {
    pub fn new(client: RecordingClient) -> Arc<Self> {
        Arc::new(Self {
            client: Arc::new(client),
            created: AtomicUsize::new(0),
        })
    }
}

impl ClientFactory for SharedFactory {
    fn create(&self) -> Result<ClientRef, TransportError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.client.clone())
    }
}

/// Engine with a gated runner, a counting actor provider and a recording tool-server client.
pub struct Harness {
    pub engine: Arc<Engine>,
    pub runner: Arc<GatedRunner>,
    pub provider: Arc<CountingProvider>,
    pub factory: Arc<SharedFactory>,
}

impl Harness {
    pub fn new(cfg: EngineConfig, client: RecordingClient) -> Self {
        init_tracing();
        let runner = GatedRunner::new();
        let provider = Arc::new(CountingProvider::default());
        let factory = SharedFactory::new(client);
        let engine = Engine::builder(cfg, runner.clone())
            .with_actor_provider(provider.clone())
            .with_mcp_client_factory(factory.clone())
            .build()
            .expect("engine builds");
        Self {
            engine,
            runner,
            provider,
            factory,
        }
    }

    pub fn client(&self) -> &RecordingClient {
        &self.factory.client
    }
}
