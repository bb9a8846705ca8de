//! Living population counts, the read-only view handed to reporters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::Organism;
use crate::species::{Kind, PlantSpecies, Sex, Species};

/// A population is scarce when fewer than this many of it (of either sex,
/// for animals) are alive.
pub const SCARCITY_THRESHOLD: u32 = 5;

/// Factor over the mean population at which a single population is flagged.
pub const IMBALANCE_FACTOR: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SexCount {
    pub male: u32,
    pub female: u32,
}

impl SexCount {
    pub fn total(&self) -> u32 {
        self.male + self.female
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub animals: BTreeMap<Species, SexCount>,
    pub plants: BTreeMap<PlantSpecies, u32>,
}

impl Census {
    /// Counts `organism` if it is alive.
    pub fn record(&mut self, organism: &Organism) {
        if !organism.is_alive() {
            return;
        }
        match organism {
            Organism::Animal(animal) => {
                let count = self.animals.entry(animal.species()).or_default();
                match animal.sex() {
                    Sex::Male => count.male += 1,
                    Sex::Female => count.female += 1,
                }
            }
            Organism::Plant(plant) => {
                *self.plants.entry(plant.species()).or_insert(0) += 1;
            }
        }
    }

    pub fn animal(&self, species: Species) -> SexCount {
        self.animals.get(&species).copied().unwrap_or_default()
    }

    pub fn plant(&self, species: PlantSpecies) -> u32 {
        self.plants.get(&species).copied().unwrap_or(0)
    }

    pub fn total(&self, kind: Kind) -> u32 {
        match kind {
            Kind::Animal(species) => self.animal(species).total(),
            Kind::Plant(species) => self.plant(species),
        }
    }

    pub fn total_animals(&self) -> u32 {
        self.animals.values().map(SexCount::total).sum()
    }

    pub fn total_plants(&self) -> u32 {
        self.plants.values().sum()
    }

    pub fn is_scarce(&self, kind: Kind) -> bool {
        match kind {
            Kind::Animal(species) => {
                let count = self.animal(species);
                count.male < SCARCITY_THRESHOLD || count.female < SCARCITY_THRESHOLD
            }
            Kind::Plant(species) => self.plant(species) < SCARCITY_THRESHOLD,
        }
    }

    /// Populations holding more than [`IMBALANCE_FACTOR`] times the mean of
    /// every tracked population, extinct ones included.
    pub fn imbalanced(&self) -> Vec<Kind> {
        let kinds: Vec<Kind> = Species::ALL
            .iter()
            .map(|s| Kind::Animal(*s))
            .chain(PlantSpecies::ALL.iter().map(|p| Kind::Plant(*p)))
            .collect();
        let sum: u32 = kinds.iter().map(|kind| self.total(*kind)).sum();
        if sum == 0 {
            return Vec::new();
        }
        let mean = f64::from(sum) / kinds.len() as f64;
        kinds
            .into_iter()
            .filter(|kind| f64::from(self.total(*kind)) > IMBALANCE_FACTOR * mean)
            .collect()
    }
}
