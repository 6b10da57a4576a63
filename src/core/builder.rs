use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::actions::{ActionRef, ActionRegistry, builtin};
use crate::cache::ActionCacheStore;
use crate::core::actor::{ActorProvider, ActorSlot};
use crate::core::config::EngineConfig;
use crate::core::engine::Engine;
use crate::core::live::LiveTasks;
use crate::core::variables::Variables;
use crate::error::EngineError;
use crate::events::Bus;
use crate::fabric::Fabric;
use crate::mcp::{ClientFactory, ToolServerManager};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::RunnerRef;

/// Builder for constructing an [`Engine`].
pub struct EngineBuilder {
    cfg: EngineConfig,
    runner: RunnerRef,
    actor_provider: Option<Arc<dyn ActorProvider>>,
    custom_actions: Vec<ActionRef>,
    client_factory: Option<Arc<dyn ClientFactory>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Engine {
    /// Starts building an engine that drives tasks with `runner`.
    pub fn builder(cfg: EngineConfig, runner: RunnerRef) -> EngineBuilder {
        EngineBuilder::new(cfg, runner)
    }
}

impl EngineBuilder {
    pub fn new(cfg: EngineConfig, runner: RunnerRef) -> Self {
        Self {
            cfg,
            runner,
            actor_provider: None,
            custom_actions: Vec::new(),
            client_factory: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the provider that starts and closes the shared actor.
    ///
    /// Without one, every task must be given an actor explicitly.
    pub fn with_actor_provider(mut self, provider: Arc<dyn ActorProvider>) -> Self {
        self.actor_provider = Some(provider);
        self
    }

    /// Adds custom actions, registered all or nothing by [`build`](Self::build).
    pub fn with_custom_actions(mut self, actions: Vec<ActionRef>) -> Self {
        self.custom_actions.extend(actions);
        self
    }

    /// Sets the factory used to create the tool-server client on first connect.
    pub fn with_mcp_client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.client_factory = Some(factory);
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive engine events through dedicated workers with
    /// bounded queues. Building with subscribers requires a Tokio runtime.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the engine.
    ///
    /// Fails with [`EngineError::RegistrationConflict`] if a custom action is
    /// reserved, clashes with a built-in or appears twice.
    pub fn build(self) -> Result<Arc<Engine>, EngineError> {
        let cfg = self.cfg;
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let fabric = Arc::new(Fabric::new(bus.clone(), cfg.task_channel_capacity_clamped()));

        let registry = Arc::new(ActionRegistry::new(
            cfg.reserved_actions.iter().cloned(),
            builtin::builtin_actions(),
        ));
        registry.register_custom(self.custom_actions)?;

        let servers = ToolServerManager::new(
            Arc::clone(&registry),
            self.client_factory,
            bus.clone(),
            cfg.diagnostic_len(),
        );

        let runtime_token = CancellationToken::new();
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        if !subs.is_empty() {
            subs.listen(&bus, runtime_token.clone());
        }

        let engine = Engine {
            cache: Arc::new(ActionCacheStore::new(cfg.cache_capacity())),
            actor: ActorSlot::new(self.actor_provider, cfg.diagnostic_len()),
            live: Arc::new(LiveTasks::default()),
            variables: Variables::default(),
            runner: self.runner,
            fabric,
            registry,
            servers,
            subs,
            runtime_token,
            cfg,
        };
        tracing::debug!(actions = engine.registry.len(), "engine built");
        Ok(Arc::new(engine))
    }
}
