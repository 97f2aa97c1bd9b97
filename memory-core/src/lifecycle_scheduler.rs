//! Periodic background tasks: prune expired facts, decay confidence, tier
//! compaction, and auto-classification of uncategorised facts. Each timer
//! catches and logs its own failures; none may crash the process.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::fact_store::{FactStore, TierCompactOptions};

/// How often each background timer fires.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerIntervals {
    /// Prune-expired and decay-confidence cadence.
    pub prune_and_decay: Duration,
    /// Auto-classification cadence.
    pub classify: Duration,
    /// Tier-compaction cadence.
    pub tier_compact: Duration,
}

impl Default for SchedulerIntervals {
    fn default() -> Self {
        Self {
            prune_and_decay: Duration::from_secs(3600),
            classify: Duration::from_secs(24 * 3600),
            tier_compact: Duration::from_secs(3600),
        }
    }
}

/// Runs the fact store's background maintenance timers on the main runtime.
pub struct LifecycleScheduler {
    facts: Arc<FactStore>,
    intervals: SchedulerIntervals,
    running: Arc<RwLock<bool>>,
    handles: RwLock<Vec<JoinHandle<()>>>,
}

impl LifecycleScheduler {
    /// Construct a scheduler over `facts`, not yet started.
    #[must_use]
    pub fn new(facts: Arc<FactStore>, intervals: SchedulerIntervals) -> Self {
        Self {
            facts,
            intervals,
            running: Arc::new(RwLock::new(false)),
            handles: RwLock::new(Vec::new()),
        }
    }

    /// Spawn the background timer tasks. Idempotent: calling `start` twice
    /// without an intervening `stop` is a no-op.
    pub fn start(&self) {
        {
            let mut running = self.running.write();
            if *running {
                return;
            }
            *running = true;
        }

        let mut handles = self.handles.write();
        handles.push(self.spawn_prune_and_decay());
        handles.push(self.spawn_tier_compact());
        handles.push(self.spawn_classify());
        info!("lifecycle scheduler started");
    }

    /// Stop all background timers.
    pub fn stop(&self) {
        *self.running.write() = false;
        for handle in self.handles.write().drain(..) {
            handle.abort();
        }
        info!("lifecycle scheduler stopped");
    }

    fn spawn_prune_and_decay(&self) -> JoinHandle<()> {
        let facts = Arc::clone(&self.facts);
        let running = Arc::clone(&self.running);
        let interval = self.intervals.prune_and_decay;
        tokio::spawn(async move {
            while *running.read() {
                tokio::time::sleep(interval).await;
                if !*running.read() {
                    break;
                }
                match facts.prune_expired().await {
                    Ok(count) if count > 0 => info!(count, "pruned expired facts"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "prune_expired failed"),
                }
                match facts.decay_confidence().await {
                    Ok(count) if count > 0 => info!(count, "decayed fact confidence"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "decay_confidence failed"),
                }
            }
        })
    }

    fn spawn_tier_compact(&self) -> JoinHandle<()> {
        let facts = Arc::clone(&self.facts);
        let running = Arc::clone(&self.running);
        let interval = self.intervals.tier_compact;
        tokio::spawn(async move {
            while *running.read() {
                tokio::time::sleep(interval).await;
                if !*running.read() {
                    break;
                }
                match facts.tier_compact(TierCompactOptions::default()).await {
                    Ok(stats) => info!(
                        moved_to_cold = stats.moved_to_cold,
                        moved_to_warm = stats.moved_to_warm,
                        moved_to_hot = stats.moved_to_hot,
                        "tier_compact tick complete"
                    ),
                    Err(e) => warn!(error = %e, "tier_compact failed"),
                }
            }
        })
    }

    fn spawn_classify(&self) -> JoinHandle<()> {
        let facts = Arc::clone(&self.facts);
        let running = Arc::clone(&self.running);
        let interval = self.intervals.classify;
        tokio::spawn(async move {
            while *running.read() {
                tokio::time::sleep(interval).await;
                if !*running.read() {
                    break;
                }
                match facts.auto_classify_uncategorized().await {
                    Ok(count) if count > 0 => info!(count, "auto-classified uncategorised facts"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "auto_classify_uncategorized failed"),
                }
            }
        })
    }
}

impl Drop for LifecycleScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
