use serde::Serialize;
use tracing::{debug, info};

/// Checkpoints emitted between phases of an analysis run.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    GenerationStarted {
        strategies: usize,
    },
    StrategyGrouped {
        index: usize,
        total: usize,
        strategy: String,
        candidates: usize,
    },
    VariantStarted {
        index: usize,
        total: usize,
        policy: String,
    },
    VariantFinished {
        index: usize,
        policy: String,
        roles: usize,
        composite_score: f64,
    },
    Completed {
        solutions: usize,
    },
}

/// Receives progress between phases. Sinks observe only; nothing they do feeds
/// back into the computation.
pub trait ProgressSink {
    fn report(&mut self, event: &ProgressEvent);
}

impl<F: FnMut(&ProgressEvent)> ProgressSink for F {
    fn report(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&mut self, _event: &ProgressEvent) {}
}

pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::GenerationStarted { strategies } => {
                info!("generating candidates across {strategies} strategies");
            }
            ProgressEvent::StrategyGrouped {
                index,
                total,
                strategy,
                candidates,
            } => {
                debug!("[{}/{total}] {strategy}: {candidates} candidates", index + 1);
            }
            ProgressEvent::VariantStarted {
                index,
                total,
                policy,
            } => {
                info!("optimizing variant {}/{total}: {policy}", index + 1);
            }
            ProgressEvent::VariantFinished {
                policy,
                roles,
                composite_score,
                ..
            } => {
                info!("{policy}: {roles} roles, composite score {composite_score:.1}");
            }
            ProgressEvent::Completed { solutions } => {
                info!("analysis complete: {solutions} solutions");
            }
        }
    }
}
