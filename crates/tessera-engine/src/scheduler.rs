//! Widget instances and their refresh timers.
//!
//! Each mounted instance runs as one tokio task that owns its refresh timer
//! and publishes its latest state on a watch channel. The task fetches the
//! definition once, renders it, then re-renders on every tick. Runs within
//! an instance never overlap: a tick that elapses during a run is delayed
//! until the run completes, so a slow response can never overwrite a newer
//! one. Dropping or reconfiguring the instance aborts the task and its
//! timer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{MountConfig, WidgetDefinition};
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::pipeline::WidgetPipeline;
use crate::render::RenderResult;
use crate::store::WidgetStore;

/// Published state of one widget instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WidgetState {
    Loading,
    Ready {
        result: RenderResult,
        rendered_at: DateTime<Utc>,
        /// Number of results published so far, across reconfigurations.
        generation: u64,
    },
}

impl WidgetState {
    pub fn result(&self) -> Option<&RenderResult> {
        match self {
            Self::Loading => None,
            Self::Ready { result, .. } => Some(result),
        }
    }

    fn generation(&self) -> u64 {
        match self {
            Self::Loading => 0,
            Self::Ready { generation, .. } => *generation,
        }
    }
}

/// State change broadcast to dashboard listeners.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceUpdate {
    pub instance_id: Uuid,
    pub widget_id: Option<i64>,
    pub state: WidgetState,
}

/// Shared collaborators for every instance.
#[derive(Clone)]
pub struct WidgetRuntime {
    pub store: Arc<dyn WidgetStore>,
    pub pipeline: Arc<WidgetPipeline>,
    pub updates: Option<broadcast::Sender<InstanceUpdate>>,
}

impl WidgetRuntime {
    pub fn new(store: Arc<dyn WidgetStore>, pipeline: Arc<WidgetPipeline>) -> Self {
        Self {
            store,
            pipeline,
            updates: None,
        }
    }

    /// Also broadcast every published state on `updates`.
    pub fn with_updates(mut self, updates: broadcast::Sender<InstanceUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }
}

/// Host value first, then the definition's. Zero disables refreshing.
pub fn effective_interval(config: &MountConfig, definition: &WidgetDefinition) -> Option<Duration> {
    config
        .refresh_interval
        .or(definition.refresh_interval)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// One mounted widget.
pub struct WidgetInstance {
    id: Uuid,
    config: MountConfig,
    runtime: WidgetRuntime,
    state: Arc<watch::Sender<WidgetState>>,
    /// Bumped on every restart; tasks from older epochs cannot publish.
    epoch: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl WidgetInstance {
    /// Mount a widget and start its task.
    pub fn mount(runtime: WidgetRuntime, config: MountConfig) -> Self {
        let id = Uuid::new_v4();
        let (tx, _rx) = watch::channel(WidgetState::Loading);
        let state = Arc::new(tx);
        let epoch = Arc::new(AtomicU64::new(0));
        let publisher = Publisher::new(id, config, &runtime, state.clone(), epoch.clone());
        let task = spawn_instance(config, runtime.clone(), publisher);

        info!(instance_id = %id, widget_id = ?config.widget_id, "Widget mounted");

        Self {
            id,
            config,
            runtime,
            state,
            epoch,
            task,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> MountConfig {
        self.config
    }

    /// Current state.
    pub fn state(&self) -> WidgetState {
        self.state.borrow().clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<WidgetState> {
        self.state.subscribe()
    }

    /// Apply a new mount config. When the widget id or interval changed the
    /// task and timer are replaced; the last published state stays visible
    /// until the new task publishes. Returns whether a restart happened.
    pub fn reconfigure(&mut self, config: MountConfig) -> bool {
        if config == self.config {
            return false;
        }

        // Bump under the watch lock so an in-flight publish from the old
        // task either lands before this or is dropped.
        let epoch = &self.epoch;
        self.state.send_if_modified(|_| {
            epoch.fetch_add(1, Ordering::SeqCst);
            false
        });
        self.task.abort();
        self.config = config;

        let publisher = Publisher::new(
            self.id,
            config,
            &self.runtime,
            self.state.clone(),
            self.epoch.clone(),
        );
        self.task = spawn_instance(config, self.runtime.clone(), publisher);

        info!(instance_id = %self.id, widget_id = ?config.widget_id, "Widget reconfigured");
        true
    }

    /// Stop the task and its timer.
    pub fn unmount(self) {
        info!(instance_id = %self.id, "Widget unmounted");
    }
}

impl Drop for WidgetInstance {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn spawn_instance(config: MountConfig, runtime: WidgetRuntime, publisher: Publisher) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_instance(config, &runtime, &publisher).await;
    })
}

struct Publisher {
    instance_id: Uuid,
    widget_id: Option<i64>,
    state: Arc<watch::Sender<WidgetState>>,
    epoch: u64,
    current_epoch: Arc<AtomicU64>,
    updates: Option<broadcast::Sender<InstanceUpdate>>,
}

impl Publisher {
    fn new(
        instance_id: Uuid,
        config: MountConfig,
        runtime: &WidgetRuntime,
        state: Arc<watch::Sender<WidgetState>>,
        current_epoch: Arc<AtomicU64>,
    ) -> Self {
        Self {
            instance_id,
            widget_id: config.widget_id,
            state,
            epoch: current_epoch.load(Ordering::SeqCst),
            current_epoch,
            updates: runtime.updates.clone(),
        }
    }

    /// Publish a result. Returns false when the instance was restarted
    /// since this publisher was created.
    fn publish(&self, result: RenderResult) -> bool {
        let mut published = None;
        self.state.send_if_modified(|current| {
            if self.current_epoch.load(Ordering::SeqCst) != self.epoch {
                return false;
            }
            let state = WidgetState::Ready {
                result,
                rendered_at: Utc::now(),
                generation: current.generation() + 1,
            };
            *current = state.clone();
            published = Some(state);
            true
        });

        let Some(state) = published else {
            debug!(instance_id = %self.instance_id, "Dropped result from a replaced task");
            return false;
        };

        if let Some(updates) = &self.updates {
            let _ = updates.send(InstanceUpdate {
                instance_id: self.instance_id,
                widget_id: self.widget_id,
                state,
            });
        }
        true
    }
}

async fn run_instance(config: MountConfig, runtime: &WidgetRuntime, publisher: &Publisher) {
    let Some(widget_id) = config.widget_id else {
        warn!(instance_id = %publisher.instance_id, "Mounted without a widget id");
        publisher.publish(RenderResult::error("Configuration error: widget_id is required"));
        return;
    };

    let definition = match runtime.store.fetch(widget_id).await {
        Ok(definition) => definition,
        Err(e) => {
            warn!(widget_id, error = %e, "Failed to load widget definition");
            publisher.publish(RenderResult::error(e.to_string()));
            return;
        }
    };

    publisher.publish(runtime.pipeline.run(&definition).await);

    let Some(period) = effective_interval(&config, &definition) else {
        debug!(widget_id, "Refresh disabled");
        return;
    };

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        debug!(widget_id, "Refreshing widget");
        publisher.publish(runtime.pipeline.run(&definition).await);
    }
}

/// Summary of a mounted instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSummary {
    pub instance_id: Uuid,
    pub config: MountConfig,
    pub state: WidgetState,
}

/// The dashboard shell's view of all mounted instances.
pub struct WidgetSupervisor {
    runtime: WidgetRuntime,
    instances: RwLock<HashMap<Uuid, WidgetInstance>>,
}

impl WidgetSupervisor {
    pub fn new(runtime: WidgetRuntime) -> Self {
        Self {
            runtime,
            instances: RwLock::new(HashMap::new()),
        }
    }

    pub fn runtime(&self) -> &WidgetRuntime {
        &self.runtime
    }

    /// Mount a new instance and return its id.
    pub async fn mount(&self, config: MountConfig) -> Uuid {
        let instance = WidgetInstance::mount(self.runtime.clone(), config);
        let id = instance.id();
        self.instances.write().await.insert(id, instance);
        id
    }

    /// Reconfigure an instance. `None` when it does not exist.
    pub async fn reconfigure(&self, id: Uuid, config: MountConfig) -> Option<bool> {
        let mut instances = self.instances.write().await;
        instances.get_mut(&id).map(|instance| instance.reconfigure(config))
    }

    /// Unmount an instance. Returns whether it existed.
    pub async fn unmount(&self, id: Uuid) -> bool {
        match self.instances.write().await.remove(&id) {
            Some(instance) => {
                instance.unmount();
                true
            }
            None => false,
        }
    }

    pub async fn state(&self, id: Uuid) -> Option<WidgetState> {
        self.instances.read().await.get(&id).map(WidgetInstance::state)
    }

    pub async fn subscribe(&self, id: Uuid) -> Option<watch::Receiver<WidgetState>> {
        self.instances.read().await.get(&id).map(WidgetInstance::subscribe)
    }

    pub async fn list(&self) -> Vec<InstanceSummary> {
        self.instances
            .read()
            .await
            .values()
            .map(|instance| InstanceSummary {
                instance_id: instance.id(),
                config: instance.config(),
                state: instance.state(),
            })
            .collect()
    }

    /// Unmount everything.
    pub async fn shutdown(&self) {
        let drained: Vec<WidgetInstance> = self.instances.write().await.drain().map(|(_, i)| i).collect();
        info!(count = drained.len(), "Unmounting all widgets");
        drained.into_iter().for_each(WidgetInstance::unmount);
    }
}
