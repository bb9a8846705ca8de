pub mod animal;
pub mod census;
pub mod clock;
pub mod disease;
pub mod engine;
pub mod entity;
pub mod error;
pub mod field;
pub mod plant;
pub mod report;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod species;
pub mod systems;
pub mod weather;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, RunOutcome, StopReason};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::{StepReport, World};
