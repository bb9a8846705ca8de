use std::rc::Rc;

use tracing::trace;

use crate::entity::{Act, DeathCause, Lifecycle, StepContext};
use crate::field::Location;
use crate::species::{PlantProfile, PlantSpecies};
use crate::world::EntityId;

/// A rooted organism. Plants never move; they age, grow within their daily
/// window and seed neighbouring cells on a fixed interval.
#[derive(Debug, Clone)]
pub struct Plant {
    lifecycle: Lifecycle,
    species: PlantSpecies,
    profile: Rc<PlantProfile>,
    age: u32,
    growth_stage: u32,
}

impl Plant {
    pub fn new(species: PlantSpecies, profile: Rc<PlantProfile>, location: Location) -> Self {
        Self {
            lifecycle: Lifecycle::new(location),
            species,
            profile,
            age: 0,
            growth_stage: 0,
        }
    }

    pub fn seedling(species: PlantSpecies, location: Location) -> Self {
        Self::new(species, Rc::new(species.profile()), location)
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    pub fn species(&self) -> PlantSpecies {
        self.species
    }

    pub fn profile(&self) -> &PlantProfile {
        &self.profile
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn growth_stage(&self) -> u32 {
        self.growth_stage
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub(crate) fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    pub fn is_alive(&self) -> bool {
        self.lifecycle.is_alive()
    }

    pub fn location(&self) -> Option<Location> {
        self.lifecycle.location()
    }

    fn can_grow(&self, ctx: &StepContext<'_>) -> bool {
        if self.profile.needs_fair_weather && !ctx.weather.is_fair() {
            return false;
        }
        self.profile.window_contains(ctx.hour)
    }

    fn on_interval(&self, interval: u32) -> bool {
        interval > 0 && self.age % interval == 0
    }

    fn reproduce(&self, here: Location, ctx: &mut StepContext<'_>) {
        let free = ctx.next.free_adjacent(here, ctx.registry, ctx.rng);
        for spot in free.into_iter().take(self.profile.spread_count as usize) {
            let shoot = Plant::new(self.species, Rc::clone(&self.profile), spot);
            ctx.spawn(shoot.into(), spot);
        }
    }
}

impl Act for Plant {
    fn act(&mut self, id: EntityId, ctx: &mut StepContext<'_>) {
        let Some(here) = self.location() else {
            return;
        };
        self.age += 1;
        if self.profile.lifespan.is_some_and(|lifespan| self.age >= lifespan) {
            if self.lifecycle.kill(DeathCause::Age) {
                trace!(id = id.raw(), species = self.species.name(), age = self.age, "Plant withered");
                ctx.tally.record_death(DeathCause::Age);
            }
            return;
        }

        if self.can_grow(ctx) && self.on_interval(self.profile.growth_rate) {
            self.growth_stage += 1;
        }
        if self.on_interval(self.profile.reproduction_interval) {
            self.reproduce(here, ctx);
        }
        ctx.place(id, here);
    }
}
