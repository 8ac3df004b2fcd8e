//! Latency Monitor
//!
//! Measures call-start to entity-return time per provisioning call, compares
//! it to the budget and keeps a running summary. Purely observational: the
//! monitor never changes what the caller receives.

use crate::provision::Tier;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Pipeline stage measured by a [`LatencyClock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Classify,
    Readiness,
    Construct,
    Fallback,
    Emergency,
    Enrich,
}

/// Elapsed time per stage, in recording order
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    stages: Vec<(Stage, u64)>,
}

impl StageTimings {
    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        self.stages.push((stage, elapsed.as_micros() as u64));
    }

    /// Microseconds spent in `stage`, summed if it ran more than once
    pub fn micros(&self, stage: Stage) -> Option<u64> {
        let mut hits = self.stages.iter().filter(|(s, _)| *s == stage).peekable();
        hits.peek()?;
        Some(hits.map(|(_, us)| us).sum())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, u64)> + '_ {
        self.stages.iter().copied()
    }
}

/// Stopwatch for one provisioning call
#[derive(Debug)]
pub struct LatencyClock {
    start: Instant,
    lap: Instant,
    timings: StageTimings,
}

impl LatencyClock {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            lap: now,
            timings: StageTimings::default(),
        }
    }

    /// Record the time since the previous lap under `stage`
    pub fn lap(&mut self, stage: Stage) {
        let now = Instant::now();
        self.timings.record(stage, now - self.lap);
        self.lap = now;
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn timings(&self) -> &StageTimings {
        &self.timings
    }
}

/// Measurement of one call
#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub elapsed_ms: u64,
    pub budget_ms: u64,
    pub within_budget: bool,
    pub tier: Tier,
    pub stages: StageTimings,
}

#[derive(Debug, Default)]
struct Totals {
    count: u64,
    within_budget: u64,
    total_ms: u64,
    max_ms: u64,
    by_tier: BTreeMap<Tier, u64>,
}

/// Running summary across calls
#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub budget_ms: u64,
    pub provisions: u64,
    pub within_budget: u64,
    pub budget_hit_rate: f64,
    pub mean_ms: f64,
    pub max_ms: u64,
    pub by_tier: BTreeMap<Tier, u64>,
}

/// Budget-checking latency monitor
pub struct LatencyMonitor {
    budget: Duration,
    totals: Mutex<Totals>,
}

impl LatencyMonitor {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            totals: Mutex::new(Totals::default()),
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Record a finished call and log it against the budget
    pub fn observe(&self, agent_id: &str, tier: Tier, clock: &LatencyClock) -> LatencyRecord {
        let elapsed = clock.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;
        let budget_ms = self.budget.as_millis() as u64;
        let within_budget = elapsed <= self.budget;

        {
            let mut totals = self.totals.lock();
            totals.count += 1;
            totals.total_ms += elapsed_ms;
            totals.max_ms = totals.max_ms.max(elapsed_ms);
            if within_budget {
                totals.within_budget += 1;
            }
            *totals.by_tier.entry(tier).or_insert(0) += 1;
        }

        if within_budget {
            info!(agent_id, tier = %tier, elapsed_ms, budget_ms, "Agent provisioned within budget");
        } else {
            warn!(
                agent_id,
                tier = %tier,
                elapsed_ms,
                budget_ms,
                "Agent provisioning exceeded latency budget"
            );
        }

        LatencyRecord {
            elapsed_ms,
            budget_ms,
            within_budget,
            tier,
            stages: clock.timings().clone(),
        }
    }

    pub fn summary(&self) -> LatencySummary {
        let totals = self.totals.lock();
        let (hit_rate, mean) = if totals.count == 0 {
            (0.0, 0.0)
        } else {
            (
                totals.within_budget as f64 / totals.count as f64,
                totals.total_ms as f64 / totals.count as f64,
            )
        };
        LatencySummary {
            budget_ms: self.budget.as_millis() as u64,
            provisions: totals.count,
            within_budget: totals.within_budget,
            budget_hit_rate: hit_rate,
            mean_ms: mean,
            max_ms: totals.max_ms,
            by_tier: totals.by_tier.clone(),
        }
    }
}
