use super::{PruneContext, Pruner};
use crate::trial::FrozenTrial;

/// Returns a fixed decision regardless of the reported values.
///
/// Useful for exercising pruning integrations: `DeterministicPruner::new(true)`
/// stops every trial at its first check, `new(false)` lets every trial finish.
#[derive(Debug, Clone, Copy)]
pub struct DeterministicPruner {
    is_pruning: bool,
}

impl DeterministicPruner {
    pub fn new(is_pruning: bool) -> Self {
        Self { is_pruning }
    }
}

impl Pruner for DeterministicPruner {
    fn prune(&self, _ctx: &PruneContext<'_>, _trial: &FrozenTrial) -> bool {
        self.is_pruning
    }

    fn name(&self) -> &'static str {
        "deterministic"
    }
}
