use anyhow::Result;
use tracing::{info, warn};

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    species::Kind,
    world::World,
};

/// Recounts the field and forgets organisms that are no longer on it.
pub struct BookkeepingSystem {
    flagged: Vec<Kind>,
}

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self {
            flagged: Vec::new(),
        }
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let field = &world.field;
        world.registry.retain(|id| field.contains(id));
        world.census = field.census(&world.registry);

        let imbalanced = world.census.imbalanced();
        for kind in imbalanced.iter().filter(|kind| !self.flagged.contains(*kind)) {
            warn!(
                step = ctx.step,
                population = %kind,
                count = world.census.total(*kind),
                "Population dominates the ecosystem"
            );
        }
        for kind in self.flagged.iter().filter(|kind| !imbalanced.contains(*kind)) {
            info!(step = ctx.step, population = %kind, "Population back in balance");
        }
        self.flagged = imbalanced;
        Ok(())
    }
}
