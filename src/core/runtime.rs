//! Runtime orchestration.
//!
//! The runtime wires configuration, lattice registry, and program host
//! into a set of partition tasks plus a coordinator handle:
//! - Start order: registry → coordinator → partitions
//! - Shutdown: signal partitions, then await their exit

use crate::cluster::coordinator::Coordinator;
use crate::cluster::partition::{Command, Partition};
use crate::cluster::programs::{NullProgramHost, ProgramHost};
use crate::cluster::routing::RoutingTable;
use crate::core::config::Config;
use crate::exec::executor::Executor;
use crate::lattice::registry::LatticeRegistry;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Component health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHealth {
    /// Component is starting.
    Starting,
    /// Component is healthy and operational.
    Healthy,
    /// Component is stopping.
    Stopping,
    /// Component has stopped.
    Stopped,
}

/// Health aggregated from runtime components.
#[derive(Debug, Clone)]
pub struct RuntimeHealth {
    /// Partition tasks.
    pub partitions: ComponentHealth,
    /// Coordinator handle.
    pub coordinator: ComponentHealth,
}

impl Default for RuntimeHealth {
    fn default() -> Self {
        Self {
            partitions: ComponentHealth::Starting,
            coordinator: ComponentHealth::Starting,
        }
    }
}

impl RuntimeHealth {
    /// Check if the runtime is ready to serve operations.
    pub fn is_ready(&self) -> bool {
        matches!(
            (self.partitions, self.coordinator),
            (ComponentHealth::Healthy, ComponentHealth::Healthy)
        )
    }
}

/// Kahn runtime holding the partition tasks and coordinator.
pub struct Runtime {
    config: Arc<Config>,
    registry: Arc<LatticeRegistry>,
    programs: Arc<dyn ProgramHost>,
    coordinator: Option<Coordinator>,
    health: RuntimeHealth,
    running: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    partition_handles: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Create a runtime with the default lattice registry and no program
    /// host installed.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_parts(
            config,
            Arc::new(LatticeRegistry::with_defaults()),
            Arc::new(NullProgramHost),
        )
    }

    /// Create a runtime with an explicit registry and program host.
    pub fn with_parts(
        config: Config,
        registry: Arc<LatticeRegistry>,
        programs: Arc<dyn ProgramHost>,
    ) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            registry,
            programs,
            coordinator: None,
            health: RuntimeHealth::default(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            shutdown_rx,
            partition_handles: Vec::new(),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the current health status.
    pub fn health(&self) -> &RuntimeHealth {
        &self.health
    }

    /// Check if the runtime is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Coordinator handle, once started.
    pub fn coordinator(&self) -> Option<Coordinator> {
        self.coordinator.clone()
    }

    /// Spawn the partition tasks and assemble the coordinator.
    pub fn start(&mut self) -> Result<Coordinator> {
        let partitions = self.config.store.partitions;
        tracing::info!(partitions, "starting Kahn runtime");

        let routing = RoutingTable::new(partitions, self.config.store.hash_seed);

        let mut mailboxes: Vec<mpsc::UnboundedSender<Command>> = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..partitions {
            let (tx, rx) = mpsc::unbounded_channel();
            mailboxes.push(tx);
            receivers.push(rx);
        }

        let coordinator = Coordinator::new(routing, mailboxes, Arc::clone(&self.programs));
        self.health.coordinator = ComponentHealth::Healthy;

        for (index, mailbox) in receivers.into_iter().enumerate() {
            let executor = Executor::new(Arc::clone(&self.registry));
            let partition = Partition::new(index as u32, executor, coordinator.clone());
            let shutdown = self.shutdown_rx.clone();
            self.partition_handles
                .push(tokio::spawn(partition.run(mailbox, shutdown)));
        }
        self.health.partitions = ComponentHealth::Healthy;

        self.running.store(true, Ordering::Release);
        self.coordinator = Some(coordinator.clone());
        tracing::info!("Kahn runtime started");
        Ok(coordinator)
    }

    /// Signal partitions to stop and await their exit.
    pub async fn shutdown(&mut self) {
        if !self.is_running() {
            return;
        }
        tracing::info!("stopping Kahn runtime");
        self.health.partitions = ComponentHealth::Stopping;
        let _ = self.shutdown_tx.send(true);

        for handle in self.partition_handles.drain(..) {
            let _ = handle.await;
        }

        self.health.partitions = ComponentHealth::Stopped;
        self.health.coordinator = ComponentHealth::Stopped;
        self.running.store(false, Ordering::Release);
        tracing::info!("Kahn runtime stopped");
    }
}
