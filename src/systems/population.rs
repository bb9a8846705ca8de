use anyhow::Result;
use tracing::trace;

use crate::{
    engine::{System, SystemContext},
    entity::{Act, Organism, StepContext, StepTally},
    rng::SystemRng,
    world::{EntityId, World},
};

/// The double-buffered step. Every organism alive at the start of the step
/// reads the frozen current field and writes itself (and any offspring) into
/// a fresh next field, which then replaces the current one.
pub struct PopulationSystem;

impl PopulationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PopulationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PopulationSystem {
    fn name(&self) -> &str {
        "population"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let acting: Vec<EntityId> = world
            .field
            .members()
            .filter(|id| world.registry.get(*id).is_some_and(Organism::is_alive))
            .collect();
        let mut next = world.field.empty_like();
        let mut tally = StepTally::default();
        let hour = world.clock.hour();
        let weather = world.weather;

        for id in acting {
            let Some(mut organism) = world.registry.take(id) else {
                continue;
            };
            // Eaten earlier this step.
            if organism.is_alive() {
                let mut step_ctx = StepContext {
                    current: &world.field,
                    next: &mut next,
                    registry: &mut world.registry,
                    rng: &mut *rng,
                    hour,
                    weather,
                    tally: &mut tally,
                };
                organism.act(id, &mut step_ctx);
            }
            world.registry.restore(id, organism);
        }

        trace!(
            step = ctx.step,
            occupants = next.len(),
            births = tally.births,
            deaths = tally.total_deaths(),
            "Field swapped"
        );
        world.field = next;
        world.tally = tally;
        Ok(())
    }
}
