use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{Context, Result};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    animal::Animal,
    clock::Clock,
    disease::Disease,
    error::SimError,
    field::{Location, DEFAULT_DEPTH, DEFAULT_WIDTH},
    plant::Plant,
    rng::{RngExt, RngManager},
    species::{AnimalProfile, FoodSource, Kind, PlantProfile, PlantSpecies, Sex, Species},
    world::World,
};

/// Keeps the seeder's stream apart from the engine's, which share the seed.
const SEEDER_SALT: u64 = 0x5eed_f1e1d;

fn default_seed() -> u64 {
    42
}

fn default_depth() -> usize {
    DEFAULT_DEPTH
}

fn default_width() -> usize {
    DEFAULT_WIDTH
}

fn default_steps() -> u64 {
    700
}

fn default_weather_refresh_steps() -> u64 {
    30
}

fn default_snapshot_interval_steps() -> u64 {
    0
}

fn default_viability() -> Vec<String> {
    Species::ALL.iter().map(|s| s.name().to_string()).collect()
}

fn default_start_hour() -> u32 {
    17
}

fn default_minutes_per_step() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockSettings {
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default)]
    pub start_minute: u32,
    #[serde(default = "default_minutes_per_step")]
    pub minutes_per_step: u32,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            start_hour: default_start_hour(),
            start_minute: 0,
            minutes_per_step: default_minutes_per_step(),
        }
    }
}

/// Per-cell creation probabilities, tried in declaration order until one
/// hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Seeding {
    pub wolf: f64,
    pub bobcat: f64,
    pub squirrel: f64,
    pub grouse: f64,
    pub seeds: f64,
    pub berries: f64,
    /// Chance a seeded carrier starts out with its species' disease.
    pub infection: f64,
}

impl Default for Seeding {
    fn default() -> Self {
        Self {
            wolf: 0.005,
            bobcat: 0.02,
            squirrel: 0.045,
            grouse: 0.05,
            seeds: 0.08,
            berries: 0.05,
            infection: 0.02,
        }
    }
}

impl Seeding {
    fn chain(&self) -> [(f64, Kind); 6] {
        [
            (self.wolf, Kind::Animal(Species::Wolf)),
            (self.bobcat, Kind::Animal(Species::Bobcat)),
            (self.squirrel, Kind::Animal(Species::Squirrel)),
            (self.grouse, Kind::Animal(Species::Grouse)),
            (self.seeds, Kind::Plant(PlantSpecies::Seeds)),
            (self.berries, Kind::Plant(PlantSpecies::Berries)),
        ]
    }

    fn probabilities(&self) -> [(&'static str, f64); 7] {
        [
            ("seeding.wolf", self.wolf),
            ("seeding.bobcat", self.bobcat),
            ("seeding.squirrel", self.squirrel),
            ("seeding.grouse", self.grouse),
            ("seeding.seeds", self.seeds),
            ("seeding.berries", self.berries),
            ("seeding.infection", self.infection),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DietEntry {
    pub food: String,
    pub nutrition: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimalOverride {
    pub breeding_age: Option<u32>,
    pub max_age: Option<u32>,
    pub breeding_probability: Option<f64>,
    pub max_litter_size: Option<u32>,
    /// Replaces the whole diet; order matters.
    pub diet: Option<Vec<DietEntry>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlantOverride {
    pub growth_rate: Option<u32>,
    pub reproduction_interval: Option<u32>,
    pub lifespan: Option<u32>,
    pub spread_count: Option<u32>,
    pub growth_start_hour: Option<u32>,
    pub growth_end_hour: Option<u32>,
    pub needs_fair_weather: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_depth")]
    pub depth: usize,
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_steps")]
    pub steps: u64,
    #[serde(default)]
    pub clock: ClockSettings,
    #[serde(default)]
    pub seeding: Seeding,
    #[serde(default = "default_weather_refresh_steps")]
    pub weather_refresh_steps: u64,
    #[serde(default = "default_viability")]
    pub viability: Vec<String>,
    #[serde(default = "default_snapshot_interval_steps")]
    pub snapshot_interval_steps: u64,
    #[serde(default)]
    pub animals: BTreeMap<String, AnimalOverride>,
    #[serde(default)]
    pub plants: BTreeMap<String, PlantOverride>,
}

/// Species parameters resolved once per scenario and shared by every
/// organism of that species.
#[derive(Debug, Clone)]
pub struct Profiles {
    animals: BTreeMap<Species, Rc<AnimalProfile>>,
    plants: BTreeMap<PlantSpecies, Rc<PlantProfile>>,
}

impl Profiles {
    pub fn animal(&self, species: Species) -> Rc<AnimalProfile> {
        self.animals
            .get(&species)
            .cloned()
            .unwrap_or_else(|| Rc::new(species.profile()))
    }

    pub fn plant(&self, species: PlantSpecies) -> Rc<PlantProfile> {
        self.plants
            .get(&species)
            .cloned()
            .unwrap_or_else(|| Rc::new(species.profile()))
    }
}

impl Default for Profiles {
    fn default() -> Self {
        Self {
            animals: Species::ALL.iter().map(|s| (*s, Rc::new(s.profile()))).collect(),
            plants: PlantSpecies::ALL.iter().map(|p| (*p, Rc::new(p.profile()))).collect(),
        }
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

fn check_probability(field: &str, value: f64) -> Result<(), SimError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::InvalidParameter {
            field: field.to_string(),
            reason: format!("{value} is not a probability"),
        })
    }
}

fn parse_species(name: &str) -> Result<Species, SimError> {
    match name.parse::<Kind>()? {
        Kind::Animal(species) => Ok(species),
        Kind::Plant(species) => Err(SimError::WrongCategory {
            name: species.name().to_string(),
            expected: "animal",
            actual: "plant",
        }),
    }
}

fn parse_plant(name: &str) -> Result<PlantSpecies, SimError> {
    match name.parse::<Kind>()? {
        Kind::Plant(species) => Ok(species),
        Kind::Animal(species) => Err(SimError::WrongCategory {
            name: species.name().to_string(),
            expected: "plant",
            actual: "animal",
        }),
    }
}

impl Scenario {
    /// The stock woodland: default grid, constants and seeding.
    pub fn woodland() -> Self {
        Self {
            name: "woodland".to_string(),
            description: Some("Wolves, bobcats, squirrels and grouse among seeds and berries".to_string()),
            seed: default_seed(),
            depth: default_depth(),
            width: default_width(),
            steps: default_steps(),
            clock: ClockSettings::default(),
            seeding: Seeding::default(),
            weather_refresh_steps: default_weather_refresh_steps(),
            viability: default_viability(),
            snapshot_interval_steps: default_snapshot_interval_steps(),
            animals: BTreeMap::new(),
            plants: BTreeMap::new(),
        }
    }

    /// Rejects settings that cannot be simulated. Unknown names in the
    /// override tables are not errors; [`Scenario::profiles`] skips them.
    pub fn validate(&self) -> Result<(), SimError> {
        for (field, value) in self.seeding.probabilities() {
            check_probability(field, value)?;
        }
        for (name, overrides) in &self.animals {
            if let Some(p) = overrides.breeding_probability {
                check_probability(&format!("animals.{name}.breeding_probability"), p)?;
            }
        }
        for (name, overrides) in &self.plants {
            for (field, hour) in [
                ("growth_start_hour", overrides.growth_start_hour),
                ("growth_end_hour", overrides.growth_end_hour),
            ] {
                if hour.is_some_and(|hour| hour >= 24) {
                    return Err(SimError::InvalidParameter {
                        field: format!("plants.{name}.{field}"),
                        reason: "hours run from 0 to 23".to_string(),
                    });
                }
            }
            let Ok(species) = parse_plant(name) else {
                continue;
            };
            let profile = apply_plant_override(species.profile(), overrides);
            if profile.growth_start_hour == profile.growth_end_hour {
                return Err(SimError::InvalidParameter {
                    field: format!("plants.{name}"),
                    reason: format!(
                        "growth window {0}..{0} is empty",
                        profile.growth_start_hour
                    ),
                });
            }
        }
        if self.clock.start_hour >= 24 || self.clock.start_minute >= 60 {
            return Err(SimError::InvalidParameter {
                field: "clock".to_string(),
                reason: format!(
                    "{:02}:{:02} is not a time of day",
                    self.clock.start_hour, self.clock.start_minute
                ),
            });
        }
        self.viability_species()?;
        Ok(())
    }

    pub fn viability_species(&self) -> Result<Vec<Species>, SimError> {
        self.viability.iter().map(|name| parse_species(name)).collect()
    }

    pub fn steps(&self, override_steps: Option<u64>) -> u64 {
        override_steps.unwrap_or(self.steps)
    }

    pub fn start_clock(&self) -> Clock {
        Clock::new(
            self.clock.start_hour,
            self.clock.start_minute,
            self.clock.minutes_per_step,
        )
    }

    /// Stock profiles with this scenario's overrides applied. Names that do
    /// not resolve to a species of the right category are skipped.
    pub fn profiles(&self) -> Profiles {
        let mut profiles = Profiles::default();
        for (name, overrides) in &self.animals {
            match parse_species(name) {
                Ok(species) => {
                    let profile = apply_animal_override(species.profile(), overrides, name);
                    profiles.animals.insert(species, Rc::new(profile));
                }
                Err(err) => warn!(%err, "Skipping animal override"),
            }
        }
        for (name, overrides) in &self.plants {
            match parse_plant(name) {
                Ok(species) => {
                    let profile = apply_plant_override(species.profile(), overrides);
                    profiles.plants.insert(species, Rc::new(profile));
                }
                Err(err) => warn!(%err, "Skipping plant override"),
            }
        }
        profiles
    }

    pub fn build_world(&self) -> World {
        let mut world = World::new(self.depth, self.width, self.start_clock());
        self.populate(&mut world);
        world
    }

    /// Clears `world` and seeds it afresh from this scenario's seed.
    pub fn populate(&self, world: &mut World) {
        world.clear();
        let mut rng = RngManager::new(self.seed ^ SEEDER_SALT);
        let mut stream = rng.stream("populate");
        let seeder = Seeder {
            seeding: &self.seeding,
            profiles: self.profiles(),
        };
        seeder.seed(world, &mut stream);
        let census = world.recount();
        world.census = census;
        info!(
            scenario = %self.name,
            depth = world.field().depth(),
            width = world.field().width(),
            animals = world.census().total_animals(),
            plants = world.census().total_plants(),
            "World populated"
        );
    }
}

fn apply_animal_override(mut profile: AnimalProfile, overrides: &AnimalOverride, name: &str) -> AnimalProfile {
    if let Some(value) = overrides.breeding_age {
        profile.breeding_age = value;
    }
    if let Some(value) = overrides.max_age {
        profile.max_age = value;
    }
    if let Some(value) = overrides.breeding_probability {
        profile.breeding_probability = value;
    }
    if let Some(value) = overrides.max_litter_size {
        profile.max_litter_size = value;
    }
    if let Some(diet) = &overrides.diet {
        profile.food_sources = diet
            .iter()
            .filter_map(|entry| match entry.food.parse::<Kind>() {
                Ok(kind) => Some(FoodSource::new(kind, entry.nutrition)),
                Err(err) => {
                    warn!(animal = name, %err, "Skipping diet entry");
                    None
                }
            })
            .collect();
    }
    profile
}

fn apply_plant_override(mut profile: PlantProfile, overrides: &PlantOverride) -> PlantProfile {
    if let Some(value) = overrides.growth_rate {
        profile.growth_rate = value;
    }
    if let Some(value) = overrides.reproduction_interval {
        profile.reproduction_interval = value;
    }
    if let Some(value) = overrides.lifespan {
        profile.lifespan = Some(value);
    }
    if let Some(value) = overrides.spread_count {
        profile.spread_count = value;
    }
    if let Some(value) = overrides.growth_start_hour {
        profile.growth_start_hour = value;
    }
    if let Some(value) = overrides.growth_end_hour {
        profile.growth_end_hour = value;
    }
    if let Some(value) = overrides.needs_fair_weather {
        profile.needs_fair_weather = value;
    }
    profile
}

struct Seeder<'a> {
    seeding: &'a Seeding,
    profiles: Profiles,
}

impl Seeder<'_> {
    /// Visits cells row by row. Each cell draws a sex, then walks the
    /// creation chain with a fresh draw per entry, then (for animals) a
    /// starting age and an infection trial.
    fn seed(&self, world: &mut World, rng: &mut dyn RngCore) {
        let diseases: BTreeMap<Species, Rc<Disease>> = Species::ALL
            .iter()
            .filter_map(|s| s.endemic_disease().map(|d| (*s, Rc::new(d))))
            .collect();
        let (depth, width) = (world.field().depth(), world.field().width());
        for row in 0..depth {
            for col in 0..width {
                let location = Location::new(row, col);
                let sex = Sex::random(rng);
                let Some(kind) = self
                    .seeding
                    .chain()
                    .into_iter()
                    .find(|(probability, _)| rng.gen::<f64>() <= *probability)
                    .map(|(_, kind)| kind)
                else {
                    continue;
                };
                match kind {
                    Kind::Animal(species) => {
                        let profile = self.profiles.animal(species);
                        let age = if profile.max_age > 0 {
                            rng.gen_range(0..profile.max_age)
                        } else {
                            0
                        };
                        let mut animal = Animal::new(species, profile, sex, age, location);
                        if let Some(disease) = diseases.get(&species) {
                            if rng.chance(self.seeding.infection) {
                                animal.infect(Rc::clone(disease));
                            }
                        }
                        world.spawn(animal);
                    }
                    Kind::Plant(species) => {
                        world.spawn(Plant::new(species, self.profiles.plant(species), location));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_takes_defaults() {
        let scenario: Scenario = serde_yaml::from_str("name: glade\n").unwrap();
        assert_eq!((scenario.depth, scenario.width), (80, 120));
        assert_eq!(scenario.steps(None), 700);
        assert_eq!(scenario.steps(Some(5)), 5);
        assert_eq!(scenario.seeding.squirrel, 0.045);
        assert_eq!(scenario.viability_species().unwrap(), Species::ALL.to_vec());
        assert_eq!(scenario.start_clock().formatted(), "17:00");
        scenario.validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut scenario = Scenario::woodland();
        scenario.seeding.wolf = 1.5;
        assert!(matches!(
            scenario.validate(),
            Err(SimError::InvalidParameter { field, .. }) if field == "seeding.wolf"
        ));

        let mut scenario = Scenario::woodland();
        scenario.viability.push("Berries".into());
        assert!(matches!(scenario.validate(), Err(SimError::WrongCategory { .. })));

        let mut scenario = Scenario::woodland();
        scenario.viability.push("Fox".into());
        assert!(matches!(scenario.validate(), Err(SimError::UnknownSpecies(_))));
    }

    #[test]
    fn empty_growth_window_is_rejected() {
        let stock_start = PlantSpecies::Seeds.profile().growth_start_hour;
        let yaml = format!("name: shut\nplants:\n  Seeds:\n    growth_end_hour: {stock_start}\n");
        let scenario: Scenario = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            scenario.validate(),
            Err(SimError::InvalidParameter { field, .. }) if field == "plants.Seeds"
        ));

        let yaml = "name: open\nplants:\n  Seeds:\n    growth_start_hour: 20\n    growth_end_hour: 4\n";
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn overrides_apply_and_unknown_names_are_skipped() {
        let yaml = r#"
name: tweaked
animals:
  wolf:
    max_age: 10
    diet:
      - { food: Grouse, nutrition: 3 }
      - { food: Unicorn, nutrition: 99 }
  Fox:
    max_age: 1
  Seeds:
    max_age: 1
plants:
  berries:
    needs_fair_weather: false
"#;
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        let profiles = scenario.profiles();
        let wolf = profiles.animal(Species::Wolf);
        assert_eq!(wolf.max_age, 10);
        assert_eq!(wolf.food_sources, vec![FoodSource::new(Kind::Animal(Species::Grouse), 3)]);
        assert_eq!(wolf.initial_food(), 3);
        assert_eq!(*profiles.animal(Species::Bobcat), Species::Bobcat.profile());
        assert!(!profiles.plant(PlantSpecies::Berries).needs_fair_weather);
    }

    #[test]
    fn populate_is_seeded_and_respects_the_chain() {
        let mut scenario = Scenario::woodland();
        scenario.depth = 20;
        scenario.width = 30;
        let a = scenario.build_world();
        let b = scenario.build_world();
        assert_eq!(a.census(), b.census());
        assert!(a.census().total_animals() > 0);

        let mut reset = b;
        scenario.populate(&mut reset);
        assert_eq!(reset.census(), a.census());
        assert_eq!(reset.registry().len(), a.registry().len());

        scenario.seeding = Seeding {
            wolf: 1.0,
            infection: 1.0,
            ..Seeding::default()
        };
        let wolves = scenario.build_world();
        assert_eq!(wolves.census().animal(Species::Wolf).total(), 600);
        assert_eq!(wolves.census().total_plants(), 0);
        let everyone_sick = wolves
            .field()
            .members()
            .filter_map(|id| wolves.organism(id).and_then(|o| o.as_animal()))
            .all(|wolf| wolf.infection().is_some() && wolf.age() < wolf.profile().max_age);
        assert!(everyone_sick);
    }

    #[test]
    fn loader_reads_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tiny.yaml"), "name: tiny\ndepth: 4\nwidth: 4\nsteps: 3\n").unwrap();
        let scenario = ScenarioLoader::new(dir.path()).load("tiny.yaml").unwrap();
        assert_eq!(scenario.name, "tiny");
        assert_eq!(scenario.build_world().field().width(), 4);

        fs::write(dir.path().join("bad.yaml"), "name: bad\nseeding: { grouse: -0.1 }\n").unwrap();
        let err = ScenarioLoader::new(dir.path()).load("bad.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("seeding.grouse"));
    }
}
