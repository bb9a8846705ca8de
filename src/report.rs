//! Plain-text status tables for the terminal.

use std::fmt;

use crate::species::{PlantSpecies, Species};
use crate::world::StepReport;

const ANIMAL_RULE: &str = "+-----------------+----------+--------+--------+";
const PLANT_RULE: &str = "+-----------------+----------+";

/// One status line followed by the animal table (total, male, female) and
/// the plant table (total).
pub struct StatusTable<'a>(pub &'a StepReport);

impl fmt::Display for StatusTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(
            f,
            "Step {} | Day {} {} | {}",
            report.step, report.days, report.time, report.weather
        )?;
        writeln!(f, "{ANIMAL_RULE}")?;
        writeln!(f, "| {:<15} | {:<8} | {:<6} | {:<6} |", "Animal", "Total", "Male", "Female")?;
        writeln!(f, "{ANIMAL_RULE}")?;
        for species in Species::ALL {
            let count = report.census.animal(species);
            writeln!(
                f,
                "| {:<15} | {:<8} | {:<6} | {:<6} |",
                species.label(),
                count.total(),
                count.male,
                count.female
            )?;
        }
        writeln!(f, "{ANIMAL_RULE}")?;
        writeln!(f, "{PLANT_RULE}")?;
        writeln!(f, "| {:<15} | {:<8} |", "Plant", "Total")?;
        writeln!(f, "{PLANT_RULE}")?;
        for species in PlantSpecies::ALL {
            writeln!(f, "| {:<15} | {:<8} |", species.name(), report.census.plant(species))?;
        }
        writeln!(f, "{PLANT_RULE}")
    }
}
