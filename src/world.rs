use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::census::Census;
use crate::clock::Clock;
use crate::entity::{DeathCause, Organism, StepTally};
use crate::field::{Field, Location};
use crate::species::Species;
use crate::weather::Condition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Owns every organism's state. Fields only hold ids into it, so the
/// current and next field can refer to the same organism.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    next_entity: u64,
    organisms: HashMap<EntityId, Organism>,
}

impl Registry {
    pub fn insert(&mut self, organism: Organism) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        self.organisms.insert(id, organism);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Organism> {
        self.organisms.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Organism> {
        self.organisms.get_mut(&id)
    }

    /// Detaches an organism so it can act with mutable access to the rest.
    /// Pair with [`Registry::restore`].
    pub fn take(&mut self, id: EntityId) -> Option<Organism> {
        self.organisms.remove(&id)
    }

    pub fn restore(&mut self, id: EntityId, organism: Organism) {
        self.organisms.insert(id, organism);
    }

    pub fn retain(&mut self, mut keep: impl FnMut(EntityId) -> bool) {
        self.organisms.retain(|id, _| keep(*id));
    }

    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }

    pub fn clear(&mut self) {
        self.organisms.clear();
    }
}

/// Read-only summary of the world after a step; what hooks, reporters and
/// snapshots consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: u64,
    pub time: String,
    pub days: u64,
    pub weather: Condition,
    pub census: Census,
    pub births: u32,
    pub deaths: BTreeMap<DeathCause, u32>,
}

pub struct World {
    step: u64,
    pub(crate) clock: Clock,
    pub(crate) weather: Condition,
    pub(crate) field: Field,
    pub(crate) registry: Registry,
    pub(crate) tally: StepTally,
    pub(crate) census: Census,
}

impl World {
    pub fn new(depth: usize, width: usize, clock: Clock) -> Self {
        Self {
            step: 0,
            clock,
            weather: Condition::Unknown,
            field: Field::new(depth, width),
            registry: Registry::default(),
            tally: StepTally::default(),
            census: Census::default(),
        }
    }

    /// Adds a living organism at its own location. Returns `None` for dead
    /// or out-of-bounds organisms.
    pub fn spawn(&mut self, organism: impl Into<Organism>) -> Option<EntityId> {
        let organism = organism.into();
        let location = organism.location()?;
        if !self.field.contains_location(location) {
            return None;
        }
        let id = self.registry.insert(organism);
        self.field.place(id, location);
        Some(id)
    }

    /// Empties the field and rewinds the step counter. The clock keeps its
    /// current time of day.
    pub fn clear(&mut self) {
        self.step = 0;
        self.field.clear();
        self.registry.clear();
        self.tally = StepTally::default();
        self.census = Census::default();
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub(crate) fn begin_step(&mut self) -> u64 {
        self.step += 1;
        self.step
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn weather(&self) -> Condition {
        self.weather
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn organism(&self, id: EntityId) -> Option<&Organism> {
        self.registry.get(id)
    }

    pub fn occupant_at(&self, location: Location) -> Option<&Organism> {
        self.field.occupant_at(location, &self.registry)
    }

    /// Census as of the last bookkeeping pass.
    pub fn census(&self) -> &Census {
        &self.census
    }

    /// Recounts the field now.
    pub fn recount(&self) -> Census {
        self.field.census(&self.registry)
    }

    pub fn last_tally(&self) -> &StepTally {
        &self.tally
    }

    pub fn is_viable(&self, tracked: &[Species]) -> bool {
        self.field.is_viable(&self.registry, tracked)
    }

    pub fn report(&self) -> StepReport {
        StepReport {
            step: self.step,
            time: self.clock.formatted(),
            days: self.clock.days(),
            weather: self.weather,
            census: self.census.clone(),
            births: self.tally.births,
            deaths: self.tally.deaths.clone(),
        }
    }
}
