//! # The engine: one actor, many tasks, a shared action registry.
//!
//! ```text
//! execute_task_async(instruction)
//!   ├─ blank? ─► Err(InvalidInput)                      (nothing allocated)
//!   ├─ epoch = current
//!   ├─ actor: caller-supplied or ActorSlot::acquire()   (epoch gated)
//!   ├─ TaskId::generate(), TaskState(PENDING)
//!   ├─ fabric.subscribe(id) ─────────┐ fails ─► Err(TaskSetup)
//!   ├─ live.insert(id, epoch) ───────┤ fails or epoch moved ─► unsubscribe, Err(TaskSetup)
//!   ├─ PENDING ─► RUNNING, TaskStarted
//!   ├─ spawn TaskRun::drive(ctx)     (runner + settlement, see core::runner)
//!   └─ Ok(TaskControls)
//! ```
//!
//! Control operations by id (`cancel`, `pause`, `resume`) act on live tasks.
//! For a task that is no longer live they report the cached status, and
//! `FAILED` for an id the engine has never seen.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::actions::{ActionInstance, ActionRegistry, ActionSet};
use crate::cache::{ActionCache, ActionCacheStore, ScriptSynthesizer};
use crate::core::actor::{ActorHandle, ActorSlot};
use crate::core::config::EngineConfig;
use crate::core::live::{LiveTask, LiveTasks};
use crate::core::runner::TaskRun;
use crate::core::variables::{Variable, Variables, validate_key};
use crate::core::{shutdown, transitions};
use crate::error::EngineError;
use crate::events::{Event, EventKind};
use crate::fabric::Fabric;
use crate::mcp::{McpConfig, ServerConfig, ServerInfo, ToolServerManager};
use crate::subscribers::SubscriberSet;
use crate::tasks::{
    ResultHandle, RunContext, RunnerRef, TaskControls, TaskId, TaskOutcome, TaskParams, TaskState,
    TaskStatus,
};

/// Orchestrates tasks against a shared actor.
///
/// Built with [`Engine::builder`]; always used behind an `Arc`.
pub struct Engine {
    pub(crate) cfg: EngineConfig,
    pub(crate) fabric: Arc<Fabric>,
    pub(crate) registry: Arc<ActionRegistry>,
    pub(crate) servers: ToolServerManager,
    pub(crate) cache: Arc<ActionCacheStore>,
    pub(crate) live: Arc<LiveTasks>,
    pub(crate) runner: RunnerRef,
    pub(crate) actor: ActorSlot,
    pub(crate) variables: Variables,
    pub(crate) subs: Arc<SubscriberSet>,
    pub(crate) runtime_token: CancellationToken,
}

impl Engine {
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// The engine-wide lifecycle fabric (bus, listeners, epoch).
    pub fn fabric(&self) -> &Fabric {
        &self.fabric
    }

    /// Receives every engine event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.fabric.bus().subscribe()
    }

    /// Current shutdown epoch.
    pub fn epoch(&self) -> u64 {
        self.fabric.epoch().current()
    }

    /// Number of fan-out subscribers attached at build time.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    // ---- tasks ----

    /// Starts a task and returns its controls without waiting for it.
    ///
    /// `actor` overrides the shared actor for this task only.
    pub async fn execute_task_async(
        &self,
        instruction: &str,
        params: TaskParams,
        actor: Option<ActorHandle>,
    ) -> Result<TaskControls, EngineError> {
        if instruction.trim().is_empty() {
            return Err(EngineError::invalid_input("task instruction must not be blank"));
        }

        // Captured before the actor, so a close that lands anywhere past this
        // point refuses the registration below.
        let epoch = self.fabric.epoch().current();
        let actor = match actor {
            Some(a) => a,
            None => self.actor.acquire(self.fabric.epoch()).await?,
        };

        let id = TaskId::generate();
        let state = Arc::new(TaskState::new(
            id.clone(),
            instruction.to_string(),
            params.output_schema.clone(),
            self.runtime_token.child_token(),
        ));

        let events = self
            .fabric
            .subscribe(id.as_str())
            .map_err(|reason| EngineError::TaskSetup {
                task_id: id.to_string(),
                reason,
            })?;

        let registered = self.live.insert(
            LiveTask {
                state: Arc::clone(&state),
                epoch,
            },
            self.fabric.epoch(),
        );
        if let Err(reason) = registered {
            self.fabric.unsubscribe(id.as_str());
            return Err(EngineError::TaskSetup {
                task_id: id.to_string(),
                reason,
            });
        }

        if let Ok(status) = state.start() {
            transitions::announce(&state, &self.fabric, status, EventKind::TaskStarted, None);
        }
        tracing::debug!(task = %id, epoch, "task started");

        let ctx = RunContext {
            actions: self.registry.snapshot(),
            task: Arc::clone(&state),
            params,
            actor,
            variables: self.variables.snapshot(),
        };
        let (tx, rx) = watch::channel(None);
        let run = TaskRun {
            runner: Arc::clone(&self.runner),
            state: Arc::clone(&state),
            fabric: Arc::clone(&self.fabric),
            live: Arc::clone(&self.live),
            cache: Arc::clone(&self.cache),
            epoch,
            max_diag: self.cfg.diagnostic_len(),
        };
        tokio::spawn(run.drive(ctx, tx));

        Ok(TaskControls::new(
            state,
            Arc::clone(&self.fabric),
            ResultHandle::new(id, rx),
            events,
        ))
    }

    /// Starts a task and waits for it to settle.
    pub async fn execute_task(
        &self,
        instruction: &str,
        params: TaskParams,
        actor: Option<ActorHandle>,
    ) -> Result<TaskOutcome, EngineError> {
        self.execute_task_async(instruction, params, actor).await?.wait().await
    }

    /// Status of a settled task, or `FAILED` for an unknown id.
    fn settled_status(&self, task_id: &str) -> TaskStatus {
        self.cache
            .get(task_id)
            .map(|c| c.status)
            .unwrap_or(TaskStatus::Failed)
    }

    pub fn cancel(&self, task_id: &str) -> TaskStatus {
        match self.live.get(task_id) {
            Some(state) => transitions::cancel(&state, &self.fabric),
            None => self.settled_status(task_id),
        }
    }

    pub fn pause(&self, task_id: &str) -> TaskStatus {
        match self.live.get(task_id) {
            Some(state) => transitions::pause(&state, &self.fabric),
            None => self.settled_status(task_id),
        }
    }

    pub fn resume(&self, task_id: &str) -> TaskStatus {
        match self.live.get(task_id) {
            Some(state) => transitions::resume(&state, &self.fabric),
            None => self.settled_status(task_id),
        }
    }

    /// Live or cached status; `None` for an id the engine does not know.
    pub fn task_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.live
            .get(task_id)
            .map(|s| s.status())
            .or_else(|| self.cache.get(task_id).map(|c| c.status))
    }

    /// Ids of tasks that started and have not settled, sorted.
    pub fn live_tasks(&self) -> Vec<TaskId> {
        self.live.ids()
    }

    // ---- action cache ----

    pub fn get_action_cache(&self, task_id: &str) -> Option<Arc<ActionCache>> {
        self.cache.get(task_id)
    }

    pub fn action_cache(&self) -> &ActionCacheStore {
        &self.cache
    }

    /// Renders the cached trace of `task_id` with `synth`; `None` if nothing is cached.
    pub fn create_script_from_action_cache(
        &self,
        synth: &dyn ScriptSynthesizer,
        task_id: &str,
    ) -> Option<String> {
        let cache = self.cache.get(task_id)?;
        Some(synth.synthesize(&cache.steps, Some(cache.task_id.as_str())))
    }

    // ---- actions ----

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Snapshot of every registered action.
    pub fn actions(&self) -> ActionSet {
        self.registry.snapshot()
    }

    /// Human-readable description of an action instance; empty if it can't be rendered.
    pub fn format_action(&self, instance: &ActionInstance) -> String {
        self.registry.format(instance)
    }

    // ---- tool servers ----

    pub async fn connect_to_mcp_server(&self, config: &ServerConfig) -> Option<String> {
        self.servers.connect_to_server(config).await
    }

    /// Disconnects a server, finishing transport teardown in the background.
    pub fn disconnect_from_mcp_server(&self, server_id: &str) -> bool {
        self.servers.disconnect_server(server_id)
    }

    pub async fn disconnect_from_mcp_server_async(&self, server_id: &str) -> bool {
        self.servers.disconnect_server_async(server_id).await
    }

    /// Replaces every tool-server connection with the ones in `config`.
    ///
    /// Returns the ids that connected.
    pub async fn initialize_mcp_client(&self, config: &McpConfig) -> Vec<String> {
        self.servers.reinitialize(config).await
    }

    pub fn list_servers(&self) -> Vec<String> {
        self.servers.server_ids()
    }

    pub fn server_info(&self) -> Vec<ServerInfo> {
        self.servers.server_info()
    }

    pub fn server_actions(&self, server_id: &str) -> Option<Vec<String>> {
        self.servers.server_actions(server_id)
    }

    pub fn is_mcp_connected(&self) -> bool {
        self.servers.is_connected()
    }

    // ---- variables ----

    pub fn add_variable(&self, var: Variable) -> Result<(), EngineError> {
        self.variables.add(var)
    }

    pub fn get_variables(&self) -> Vec<Variable> {
        self.variables.snapshot()
    }

    pub fn get_variable(&self, key: &str) -> Option<Variable> {
        self.variables.get(key)
    }

    /// Removes a variable; returns `Ok(false)` if it did not exist.
    pub fn delete_variable(&self, key: &str) -> Result<bool, EngineError> {
        validate_key(key)?;
        Ok(self.variables.remove(key))
    }

    // ---- shutdown ----

    /// Drains every live task, closes the actor and every tool-server connection.
    ///
    /// Live tasks read `CANCELLED` on the first poll of the returned future,
    /// before it suspends; their result handles resolve with
    /// [`CLOSED_OUTPUT`](crate::CLOSED_OUTPUT) once their runners return. The
    /// engine stays usable: the next task starts a fresh actor.
    pub async fn close_agent(&self) {
        shutdown::drain(&self.fabric, &self.live);
        self.actor.close().await;
        self.servers.shutdown().await;
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;
    use crate::tasks::{RunnerFn, TaskOutput};

    fn engine() -> Arc<Engine> {
        let runner = RunnerFn::arc(|_ctx: RunContext| async {
            Ok::<_, Rejection>(TaskOutput::completed("done"))
        });
        Engine::builder(EngineConfig::default(), runner).build().unwrap()
    }

    fn actor() -> Option<ActorHandle> {
        Some(Arc::new("actor"))
    }

    #[tokio::test]
    async fn failed_registration_leaves_no_subscription() {
        let engine = engine();
        engine.live.poison();

        let err = engine
            .execute_task_async("open the page", TaskParams::default(), actor())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::TaskSetup { .. }), "{err:?}");
        assert_eq!(engine.fabric.subscriptions(), 0);
        assert!(engine.live.drain().is_empty());
        assert!(engine.cache.is_empty());
    }

    #[tokio::test]
    async fn registration_after_a_close_is_refused() {
        let engine = engine();
        let captured = engine.fabric.epoch().current();
        engine.close_agent().await;

        let state = Arc::new(TaskState::new(
            TaskId::generate(),
            "open the page".into(),
            None,
            engine.runtime_token.child_token(),
        ));
        let res = engine.live.insert(
            LiveTask {
                state,
                epoch: captured,
            },
            engine.fabric.epoch(),
        );
        assert!(res.is_err());
        assert!(engine.live_tasks().is_empty());
    }
}
