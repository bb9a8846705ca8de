use std::rc::Rc;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::rng::RngExt;

/// Immutable description of an affliction. Hosts share it through
/// [`Infection`], which carries the per-host step counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    pub name: String,
    /// Steps after which a lethal disease kills its host.
    pub duration: u32,
    pub transmission_rate: f64,
    pub lethal: bool,
    /// Steps after which the host recovers. Checked before lethality, so a
    /// lethal disease only kills when this exceeds `duration`.
    pub recovery_after: u32,
}

impl Disease {
    pub fn new(name: impl Into<String>, duration: u32, transmission_rate: f64, lethal: bool) -> Self {
        Self {
            name: name.into(),
            duration,
            transmission_rate,
            lethal,
            recovery_after: duration,
        }
    }

    pub fn with_recovery_after(mut self, steps: u32) -> Self {
        self.recovery_after = steps;
        self
    }

    pub fn flu() -> Self {
        Self::new("Flu", 10, 0.3, false)
    }

    pub fn rabies() -> Self {
        Self::new("Rabies", 20, 0.7, true)
    }

    pub fn spreads(&self, rng: &mut dyn RngCore) -> bool {
        rng.chance(self.transmission_rate)
    }

    pub fn is_cured(&self, steps_infected: u32) -> bool {
        steps_infected >= self.recovery_after
    }

    pub fn is_fatal(&self, steps_infected: u32) -> bool {
        self.lethal && steps_infected >= self.duration
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progression {
    Ongoing,
    Recovered,
    Fatal,
}

#[derive(Debug, Clone)]
pub struct Infection {
    disease: Rc<Disease>,
    steps_infected: u32,
}

impl Infection {
    pub fn new(disease: Rc<Disease>) -> Self {
        Self {
            disease,
            steps_infected: 0,
        }
    }

    pub fn disease(&self) -> &Rc<Disease> {
        &self.disease
    }

    pub fn steps_infected(&self) -> u32 {
        self.steps_infected
    }

    /// Counts one more step of illness and reports what it led to.
    pub fn progress(&mut self) -> Progression {
        self.steps_infected += 1;
        if self.disease.is_cured(self.steps_infected) {
            Progression::Recovered
        } else if self.disease.is_fatal(self.steps_infected) {
            Progression::Fatal
        } else {
            Progression::Ongoing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn run_until_settled(infection: &mut Infection) -> (u32, Progression) {
        loop {
            let outcome = infection.progress();
            if outcome != Progression::Ongoing {
                return (infection.steps_infected(), outcome);
            }
        }
    }

    #[test]
    fn flu_clears_at_duration() {
        let mut infection = Infection::new(Rc::new(Disease::flu()));
        assert_eq!(run_until_settled(&mut infection), (10, Progression::Recovered));
    }

    #[test]
    fn cure_is_checked_before_lethality() {
        let mut infection = Infection::new(Rc::new(Disease::rabies()));
        assert_eq!(run_until_settled(&mut infection), (20, Progression::Recovered));
    }

    #[test]
    fn late_recovery_lets_lethal_disease_kill() {
        let disease = Disease::rabies().with_recovery_after(25);
        let mut infection = Infection::new(Rc::new(disease));
        assert_eq!(run_until_settled(&mut infection), (20, Progression::Fatal));
    }

    #[test]
    fn transmission_rate_is_respected() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let certain = Disease::new("Certain", 5, 1.0, false);
        let inert = Disease::new("Inert", 5, 0.0, false);
        assert!((0..200).all(|_| certain.spreads(&mut rng)));
        assert!((0..200).all(|_| !inert.spreads(&mut rng)));

        let rabies = Disease::rabies();
        let hits = (0..10_000).filter(|_| rabies.spreads(&mut rng)).count();
        assert!((6_500..7_500).contains(&hits), "hits = {hits}");
    }
}
