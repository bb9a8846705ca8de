use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    rng::{RngManager, SystemRng},
    snapshot::SnapshotWriter,
    species::Species,
    world::{StepReport, World},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_steps: u64,
    pub snapshot_dir: PathBuf,
    /// Species that must all have a living member for a step to start.
    pub viability: Vec<Species>,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_steps,
            ),
            settings: self.settings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    BudgetExhausted,
    /// A tracked species died out.
    Collapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub steps: u64,
    pub reason: StopReason,
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn run(&mut self, world: &mut World, steps: u64) -> Result<RunOutcome> {
        self.run_with_hook(world, steps, |_| {})
    }

    /// Runs up to `steps` steps, calling `hook` after each one. Stops early
    /// when the world is no longer viable.
    pub fn run_with_hook<F>(&mut self, world: &mut World, steps: u64, mut hook: F) -> Result<RunOutcome>
    where
        F: FnMut(&StepReport),
    {
        for executed in 0..steps {
            if !world.is_viable(&self.settings.viability) {
                info!(
                    step = world.step(),
                    scenario = %self.settings.scenario_name,
                    "Ecosystem no longer viable; stopping"
                );
                return Ok(RunOutcome {
                    steps: executed,
                    reason: StopReason::Collapsed,
                });
            }
            let report = self.step(world)?;
            hook(&report);
        }
        Ok(RunOutcome {
            steps,
            reason: StopReason::BudgetExhausted,
        })
    }

    /// Runs every system once, in order, regardless of viability.
    pub fn step(&mut self, world: &mut World) -> Result<StepReport> {
        let current_step = world.begin_step();
        let ctx = SystemContext {
            step: current_step,
            scenario_name: &self.settings.scenario_name,
        };
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name());
            system
                .run(&ctx, world, &mut rng_stream)
                .with_context(|| format!("System '{}' failed at step {current_step}", system.name()))?;
        }
        let report = world.report();
        debug!(
            step = report.step,
            time = %report.time,
            weather = %report.weather,
            births = report.births,
            deaths = report.deaths.values().sum::<u32>(),
            "Step complete"
        );
        self.snapshot_writer
            .maybe_write(&self.settings.scenario_name, &report)?;
        Ok(report)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

pub struct SystemContext<'a> {
    pub step: u64,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}
