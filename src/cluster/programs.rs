//! Program host for the `thread` operation.
//!
//! The executor places no constraints on a spawned computation beyond its
//! use of the coordinator's operations. Program registration and execution
//! belong to a collaborator; this module defines the interface the
//! coordinator consumes plus an in-memory registry good enough to run
//! programs in-process.

use crate::cluster::coordinator::Coordinator;
use crate::core::error::{KahnError, KahnResult};
use crate::store::id::ThreadId;
use crate::store::value::Datum;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future type a program body resolves to.
pub type ProgramFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A registered program body.
pub type ProgramFn = Arc<dyn Fn(Coordinator, Vec<Datum>) -> ProgramFuture + Send + Sync>;

/// Host for named user computations.
pub trait ProgramHost: Send + Sync {
    /// Spawn a cooperative execution unit running the named computation,
    /// fire-and-forget. Returns the unit's opaque handle.
    fn spawn(
        &self,
        module: &str,
        function: &str,
        args: Vec<Datum>,
        ctx: Coordinator,
    ) -> KahnResult<ThreadId>;
}

/// In-memory program registry keyed by `(module, function)`.
#[derive(Default)]
pub struct ProgramRegistry {
    programs: RwLock<HashMap<(String, String), ProgramFn>>,
}

impl ProgramRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program body under a module and function name.
    pub fn register<F, Fut>(&self, module: impl Into<String>, function: impl Into<String>, body: F)
    where
        F: Fn(Coordinator, Vec<Datum>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let wrapped: ProgramFn =
            Arc::new(move |ctx, args| -> ProgramFuture { Box::pin(body(ctx, args)) });
        self.programs
            .write()
            .insert((module.into(), function.into()), wrapped);
    }

    /// Number of registered programs.
    pub fn len(&self) -> usize {
        self.programs.read().len()
    }

    /// Check if no programs are registered.
    pub fn is_empty(&self) -> bool {
        self.programs.read().is_empty()
    }
}

impl ProgramHost for ProgramRegistry {
    fn spawn(
        &self,
        module: &str,
        function: &str,
        args: Vec<Datum>,
        ctx: Coordinator,
    ) -> KahnResult<ThreadId> {
        let body = self
            .programs
            .read()
            .get(&(module.to_string(), function.to_string()))
            .cloned()
            .ok_or_else(|| KahnError::UnknownProgram {
                module: module.to_string(),
                function: function.to_string(),
            })?;

        let handle = ThreadId::fresh();
        tracing::debug!(%module, %function, thread = %handle, "spawning program");
        tokio::spawn(body(ctx, args));
        Ok(handle)
    }
}

/// Program host used when the collaborator is absent.
pub struct NullProgramHost;

impl ProgramHost for NullProgramHost {
    fn spawn(
        &self,
        _module: &str,
        _function: &str,
        _args: Vec<Datum>,
        _ctx: Coordinator,
    ) -> KahnResult<ThreadId> {
        Err(KahnError::NotImplemented { operation: "thread" })
    }
}
