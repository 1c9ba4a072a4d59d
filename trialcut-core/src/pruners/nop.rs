use super::{PruneContext, Pruner};
use crate::trial::FrozenTrial;

/// Never prunes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopPruner;

impl Pruner for NopPruner {
    fn prune(&self, _ctx: &PruneContext<'_>, _trial: &FrozenTrial) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "nop"
    }
}
