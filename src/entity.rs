//! The lifecycle contract shared by every occupant of the field, and the
//! per-step context an occupant acts against.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::animal::Animal;
use crate::field::{Field, Location};
use crate::plant::Plant;
use crate::species::{Kind, Sex};
use crate::weather::Condition;
use crate::world::{EntityId, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Age,
    Disease,
    Starvation,
    Eaten,
    Stranded,
    /// Lost its cell in the next field to a later arrival.
    Displaced,
}

/// Alive with a location, or dead without one. Death happens once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    location: Option<Location>,
    death: Option<DeathCause>,
}

impl Lifecycle {
    pub fn new(location: Location) -> Self {
        Self {
            location: Some(location),
            death: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub fn death(&self) -> Option<DeathCause> {
        self.death
    }

    pub fn relocate(&mut self, location: Location) {
        if self.is_alive() {
            self.location = Some(location);
        }
    }

    /// Returns false if the entity was already dead.
    pub fn kill(&mut self, cause: DeathCause) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.death = Some(cause);
        self.location = None;
        true
    }
}

/// Births and deaths accumulated over one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTally {
    pub births: u32,
    pub deaths: BTreeMap<DeathCause, u32>,
}

impl StepTally {
    pub fn record_death(&mut self, cause: DeathCause) {
        *self.deaths.entry(cause).or_insert(0) += 1;
    }

    pub fn total_deaths(&self) -> u32 {
        self.deaths.values().sum()
    }
}

/// What one entity sees while it acts: the frozen field it reads, the field
/// being built for the next step, and the shared random source.
pub struct StepContext<'a> {
    pub current: &'a Field,
    pub next: &'a mut Field,
    pub registry: &'a mut Registry,
    pub rng: &'a mut dyn RngCore,
    pub hour: u32,
    pub weather: Condition,
    pub tally: &'a mut StepTally,
}

impl StepContext<'_> {
    /// Registers a newborn and places it in the next field.
    pub fn spawn(&mut self, organism: Organism, location: Location) -> EntityId {
        let id = self.registry.insert(organism);
        self.place(id, location);
        self.tally.births += 1;
        id
    }

    /// Claims `location` in the next field for `id`. A living organism
    /// already holding the cell dies as [`DeathCause::Displaced`].
    pub fn place(&mut self, id: EntityId, location: Location) {
        if let Some(previous) = self.next.id_at(location).filter(|previous| *previous != id) {
            if let Some(occupant) = self.registry.get_mut(previous) {
                if occupant.kill(DeathCause::Displaced) {
                    trace!(id = previous.raw(), by = id.raw(), %location, "Organism displaced");
                    self.tally.record_death(DeathCause::Displaced);
                }
            }
        }
        self.next.place(id, location);
    }
}

pub trait Act {
    /// Runs one step. `id` is this entity's handle; the entity itself is
    /// detached from the registry while it acts.
    fn act(&mut self, id: EntityId, ctx: &mut StepContext<'_>);
}

#[derive(Debug, Clone)]
pub enum Organism {
    Animal(Animal),
    Plant(Plant),
}

impl Organism {
    pub fn kind(&self) -> Kind {
        match self {
            Organism::Animal(animal) => Kind::Animal(animal.species()),
            Organism::Plant(plant) => Kind::Plant(plant.species()),
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        match self {
            Organism::Animal(animal) => animal.lifecycle(),
            Organism::Plant(plant) => plant.lifecycle(),
        }
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        match self {
            Organism::Animal(animal) => animal.lifecycle_mut(),
            Organism::Plant(plant) => plant.lifecycle_mut(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.lifecycle().is_alive()
    }

    pub fn location(&self) -> Option<Location> {
        self.lifecycle().location()
    }

    pub fn kill(&mut self, cause: DeathCause) -> bool {
        self.lifecycle_mut().kill(cause)
    }

    pub fn sex(&self) -> Option<Sex> {
        self.as_animal().map(Animal::sex)
    }

    pub fn as_animal(&self) -> Option<&Animal> {
        match self {
            Organism::Animal(animal) => Some(animal),
            Organism::Plant(_) => None,
        }
    }

    pub fn as_animal_mut(&mut self) -> Option<&mut Animal> {
        match self {
            Organism::Animal(animal) => Some(animal),
            Organism::Plant(_) => None,
        }
    }

    pub fn as_plant(&self) -> Option<&Plant> {
        match self {
            Organism::Plant(plant) => Some(plant),
            Organism::Animal(_) => None,
        }
    }
}

impl Act for Organism {
    fn act(&mut self, id: EntityId, ctx: &mut StepContext<'_>) {
        match self {
            Organism::Animal(animal) => animal.act(id, ctx),
            Organism::Plant(plant) => plant.act(id, ctx),
        }
    }
}

impl From<Animal> for Organism {
    fn from(animal: Animal) -> Self {
        Organism::Animal(animal)
    }
}

impl From<Plant> for Organism {
    fn from(plant: Plant) -> Self {
        Organism::Plant(plant)
    }
}
