//! Species roster and the per-species parameter tables.
//!
//! The roster is closed: every organism is tagged with one of these variants,
//! and offspring are built from the parent's tag and profile.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::disease::Disease;
use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Sex::Male
        } else {
            Sex::Female
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Sex::Male => Sex::Female,
            Sex::Female => Sex::Male,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Wolf,
    Bobcat,
    Squirrel,
    Grouse,
}

impl Species {
    pub const ALL: [Species; 4] = [
        Species::Wolf,
        Species::Bobcat,
        Species::Squirrel,
        Species::Grouse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Species::Wolf => "Wolf",
            Species::Bobcat => "Bobcat",
            Species::Squirrel => "Squirrel",
            Species::Grouse => "Grouse",
        }
    }

    /// Plural label used by the status table.
    pub fn label(self) -> &'static str {
        match self {
            Species::Wolf => "Wolves",
            Species::Bobcat => "Bobcats",
            Species::Squirrel => "Squirrels",
            Species::Grouse => "Grouse",
        }
    }

    pub fn profile(self) -> AnimalProfile {
        match self {
            Species::Wolf => AnimalProfile {
                breeding_age: 10,
                max_age: 140,
                breeding_probability: 0.05,
                max_litter_size: 6,
                food_sources: vec![
                    FoodSource::new(Kind::Animal(Species::Squirrel), 12),
                    FoodSource::new(Kind::Animal(Species::Grouse), 7),
                ],
            },
            Species::Bobcat => AnimalProfile {
                breeding_age: 8,
                max_age: 130,
                breeding_probability: 0.06,
                max_litter_size: 3,
                food_sources: vec![FoodSource::new(Kind::Animal(Species::Squirrel), 20)],
            },
            Species::Squirrel => AnimalProfile {
                breeding_age: 5,
                max_age: 120,
                breeding_probability: 0.08,
                max_litter_size: 4,
                food_sources: vec![FoodSource::new(Kind::Plant(PlantSpecies::Berries), 8)],
            },
            Species::Grouse => AnimalProfile {
                breeding_age: 5,
                max_age: 130,
                breeding_probability: 0.09,
                max_litter_size: 6,
                food_sources: Vec::new(),
            },
        }
    }

    /// Disease a freshly seeded individual may already carry.
    pub fn endemic_disease(self) -> Option<Disease> {
        match self {
            Species::Wolf => Some(Disease::rabies()),
            Species::Bobcat => Some(Disease::flu()),
            Species::Squirrel | Species::Grouse => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantSpecies {
    Seeds,
    Berries,
}

impl PlantSpecies {
    pub const ALL: [PlantSpecies; 2] = [PlantSpecies::Seeds, PlantSpecies::Berries];

    pub fn name(self) -> &'static str {
        match self {
            PlantSpecies::Seeds => "Seeds",
            PlantSpecies::Berries => "Berries",
        }
    }

    pub fn profile(self) -> PlantProfile {
        match self {
            PlantSpecies::Seeds => PlantProfile {
                growth_rate: 5,
                reproduction_interval: 10,
                lifespan: None,
                spread_count: 3,
                growth_start_hour: 6,
                growth_end_hour: 18,
                needs_fair_weather: false,
            },
            PlantSpecies::Berries => PlantProfile {
                growth_rate: 15,
                reproduction_interval: 5,
                lifespan: Some(250),
                spread_count: 1,
                growth_start_hour: 18,
                growth_end_hour: 6,
                needs_fair_weather: true,
            },
        }
    }
}

/// Anything that can occupy a cell, at species granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    Animal(Species),
    Plant(PlantSpecies),
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Animal(species) => species.name(),
            Kind::Plant(species) => species.name(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = SimError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let wanted = name.trim();
        Species::ALL
            .iter()
            .map(|s| Kind::Animal(*s))
            .chain(PlantSpecies::ALL.iter().map(|p| Kind::Plant(*p)))
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SimError::UnknownSpecies(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoodSource {
    pub kind: Kind,
    pub nutrition: i32,
}

impl FoodSource {
    pub fn new(kind: Kind, nutrition: i32) -> Self {
        Self { kind, nutrition }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimalProfile {
    pub breeding_age: u32,
    pub max_age: u32,
    pub breeding_probability: f64,
    pub max_litter_size: u32,
    /// Ordered: the first entry also sets the starting food level.
    pub food_sources: Vec<FoodSource>,
}

impl AnimalProfile {
    pub fn nutrition_for(&self, kind: Kind) -> Option<i32> {
        self.food_sources
            .iter()
            .find(|source| source.kind == kind)
            .map(|source| source.nutrition)
    }

    pub fn initial_food(&self) -> i32 {
        self.food_sources.first().map_or(0, |source| source.nutrition)
    }

    pub fn forages(&self) -> bool {
        !self.food_sources.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantProfile {
    pub growth_rate: u32,
    pub reproduction_interval: u32,
    /// `None` lives forever.
    pub lifespan: Option<u32>,
    pub spread_count: u32,
    pub growth_start_hour: u32,
    pub growth_end_hour: u32,
    /// Only grows under Sunny or Cloudy skies.
    pub needs_fair_weather: bool,
}

impl PlantProfile {
    /// A window whose start is after its end wraps past midnight. Equal
    /// bounds give an empty window; scenarios reject them.
    pub fn window_contains(&self, hour: u32) -> bool {
        let (start, end) = (self.growth_start_hour, self.growth_end_hour);
        if start <= end {
            start <= hour && hour < end
        } else {
            hour >= start || hour < end
        }
    }
}
