use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    weather::Weather,
    world::World,
};

/// Moves the clock forward one step and keeps the weather current.
pub struct EnvironmentSystem {
    weather: Weather,
}

impl EnvironmentSystem {
    pub fn new(weather: Weather) -> Self {
        Self { weather }
    }
}

impl System for EnvironmentSystem {
    fn name(&self) -> &str {
        "environment"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        world.clock.advance();
        world.weather = self.weather.update(ctx.step, rng);
        Ok(())
    }
}
