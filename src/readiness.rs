//! Readiness Gate
//!
//! Single-flight, bounded-wait guard around a lazily initialized shared
//! resource. The first caller moves the gate from `Uninitialized` to
//! `Initializing` and spawns setup on the runtime; every other caller waits on
//! the same outcome. A caller whose wait times out does not cancel setup, and a
//! failed setup is recorded once and never retried by the gate.

use crate::error::ProvisionError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Produces the guarded resource. Called at most once per gate.
#[async_trait]
pub trait GateInitializer<T>: Send + Sync {
    async fn initialize(&self) -> Result<T, ProvisionError>;
}

/// Gate lifecycle. Transitions are monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePhase {
    Uninitialized,
    Initializing,
    Ready,
    /// Setup ran and failed; terminal for the process lifetime
    Failed,
}

impl GatePhase {
    fn is_terminal(self) -> bool {
        matches!(self, GatePhase::Ready | GatePhase::Failed)
    }
}

impl fmt::Display for GatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GatePhase::Uninitialized => "uninitialized",
            GatePhase::Initializing => "initializing",
            GatePhase::Ready => "ready",
            GatePhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of a bounded wait
pub enum Readiness<T> {
    Ready(Arc<T>),
    TimedOut,
    Failed(String),
}

impl<T> Readiness<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready(_))
    }
}

impl<T> fmt::Debug for Readiness<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Ready(_) => f.write_str("Ready"),
            Readiness::TimedOut => f.write_str("TimedOut"),
            Readiness::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
        }
    }
}

struct GateSlot<T> {
    resource: Option<Arc<T>>,
    failure: Option<String>,
    init_elapsed: Option<Duration>,
}

/// Readiness gate guarding a resource of type `T`
pub struct ReadinessGate<T> {
    initializer: Arc<dyn GateInitializer<T>>,
    slot: RwLock<GateSlot<T>>,
    phase: watch::Sender<GatePhase>,
}

impl<T: Send + Sync + 'static> ReadinessGate<T> {
    pub fn new(initializer: Arc<dyn GateInitializer<T>>) -> Arc<Self> {
        let (phase, _) = watch::channel(GatePhase::Uninitialized);
        Arc::new(Self {
            initializer,
            slot: RwLock::new(GateSlot {
                resource: None,
                failure: None,
                init_elapsed: None,
            }),
            phase,
        })
    }

    /// Gate that is already open on `resource`
    pub fn ready(resource: T, initializer: Arc<dyn GateInitializer<T>>) -> Arc<Self> {
        let (phase, _) = watch::channel(GatePhase::Ready);
        Arc::new(Self {
            initializer,
            slot: RwLock::new(GateSlot {
                resource: Some(Arc::new(resource)),
                failure: None,
                init_elapsed: Some(Duration::ZERO),
            }),
            phase,
        })
    }

    pub fn phase(&self) -> GatePhase {
        *self.phase.borrow()
    }

    /// Recorded initialization failure, if any
    pub fn failure(&self) -> Option<String> {
        self.slot.read().failure.clone()
    }

    /// Time setup took, once it has finished
    pub fn init_elapsed(&self) -> Option<Duration> {
        self.slot.read().init_elapsed
    }

    /// Non-blocking access to the resource
    pub fn try_ready(&self) -> Option<Arc<T>> {
        if self.phase() == GatePhase::Ready {
            self.slot.read().resource.clone()
        } else {
            None
        }
    }

    /// Begin initialization if nobody has. Returns whether this call started it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self: &Arc<Self>) -> bool {
        let won = self.phase.send_if_modified(|phase| {
            if *phase == GatePhase::Uninitialized {
                *phase = GatePhase::Initializing;
                true
            } else {
                false
            }
        });
        if !won {
            return false;
        }

        debug!("Readiness gate initialization started");
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            let started = Instant::now();
            let initializer = Arc::clone(&gate.initializer);
            // Run setup on its own task so a panic surfaces as a JoinError
            let result = match tokio::spawn(async move { initializer.initialize().await }).await {
                Ok(result) => result,
                Err(join_err) => Err(ProvisionError::ReadinessFailed(format!(
                    "initializer aborted: {}",
                    join_err
                ))),
            };
            gate.complete(result, started.elapsed());
        });
        true
    }

    /// Wait up to `timeout` for the gate to open, starting setup if needed.
    pub async fn await_ready(self: &Arc<Self>, timeout: Duration) -> Readiness<T> {
        if let Some(outcome) = self.settled() {
            return outcome;
        }

        let mut rx = self.phase.subscribe();
        self.start();

        let wait = async {
            loop {
                if rx.borrow_and_update().is_terminal() {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(()) => self.settled().unwrap_or(Readiness::TimedOut),
            Err(_) => {
                debug!(
                    timeout_ms = timeout.as_millis() as u64,
                    phase = %self.phase(),
                    "Readiness wait timed out"
                );
                Readiness::TimedOut
            }
        }
    }

    fn settled(&self) -> Option<Readiness<T>> {
        match self.phase() {
            GatePhase::Ready => self.slot.read().resource.clone().map(Readiness::Ready),
            GatePhase::Failed => Some(Readiness::Failed(
                self.failure().unwrap_or_else(|| "unknown failure".to_string()),
            )),
            GatePhase::Uninitialized | GatePhase::Initializing => None,
        }
    }

    fn complete(&self, result: Result<T, ProvisionError>, elapsed: Duration) {
        let next = {
            let mut slot = self.slot.write();
            slot.init_elapsed = Some(elapsed);
            match result {
                Ok(resource) => {
                    slot.resource = Some(Arc::new(resource));
                    info!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Readiness gate open"
                    );
                    GatePhase::Ready
                }
                Err(e) => {
                    error!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %e,
                        "Readiness gate initialization failed; fallback tiers remain available"
                    );
                    slot.failure = Some(e.to_string());
                    GatePhase::Failed
                }
            }
        };
        self.phase.send_replace(next);
    }
}
