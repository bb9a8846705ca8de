//! Weather collaborator.
//!
//! A [`WeatherSource`] hands back a raw weatherapi-style JSON payload. Any
//! failure to obtain or read one is absorbed here: the simulation gets a
//! uniformly random condition instead and never sees the error.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Sunny,
    Rainy,
    Snowy,
    Cloudy,
    Unknown,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::Sunny,
        Condition::Rainy,
        Condition::Snowy,
        Condition::Cloudy,
        Condition::Unknown,
    ];

    /// Maps free-form condition text ("Patchy light drizzle", "Overcast")
    /// onto the coarse categories the plants care about.
    pub fn from_description(text: &str) -> Self {
        let text = text.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|word| text.contains(word));
        if mentions(&["sunny", "clear"]) {
            Condition::Sunny
        } else if mentions(&["rain", "drizzle", "torrential"]) {
            Condition::Rainy
        } else if mentions(&["snow", "sleet", "ice", "blizzard"]) {
            Condition::Snowy
        } else if mentions(&["cloud", "overcast", "mist", "fog"]) {
            Condition::Cloudy
        } else {
            Condition::Unknown
        }
    }

    pub fn random(rng: &mut dyn RngCore) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&Condition::Unknown)
    }

    /// Sunny or cloudy.
    pub fn is_fair(self) -> bool {
        matches!(self, Condition::Sunny | Condition::Cloudy)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather source unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read weather payload: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed weather payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("weather service rejected the request: {0}")]
    Rejected(String),
    #[error("weather payload has no current condition text")]
    MissingCondition,
}

pub trait WeatherSource {
    /// Returns the raw JSON payload describing current conditions.
    fn fetch(&mut self) -> Result<String, WeatherError>;
}

/// Always fails, so every refresh falls back to random weather.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSource;

impl WeatherSource for OfflineSource {
    fn fetch(&mut self) -> Result<String, WeatherError> {
        Err(WeatherError::Unavailable("no weather source configured".into()))
    }
}

/// Re-reads a payload file on every fetch, so it can be edited mid-run.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WeatherSource for FileSource {
    fn fetch(&mut self) -> Result<String, WeatherError> {
        Ok(fs::read_to_string(&self.path)?)
    }
}

/// Reads `current.condition.text` from a payload. A top-level `error`
/// object marks a rejected request.
pub fn parse_payload(payload: &str) -> Result<Condition, WeatherError> {
    let value: Value = serde_json::from_str(payload)?;
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(WeatherError::Rejected(message));
    }
    value
        .pointer("/current/condition/text")
        .and_then(Value::as_str)
        .map(Condition::from_description)
        .ok_or(WeatherError::MissingCondition)
}

pub struct Weather {
    source: Box<dyn WeatherSource>,
    refresh_every: u64,
    last_refresh: Option<u64>,
    current: Condition,
}

impl Weather {
    /// `refresh_every` is in steps; zero refreshes on every step.
    pub fn new(source: Box<dyn WeatherSource>, refresh_every: u64) -> Self {
        Self {
            source,
            refresh_every,
            last_refresh: None,
            current: Condition::Unknown,
        }
    }

    pub fn offline(refresh_every: u64) -> Self {
        Self::new(Box::new(OfflineSource), refresh_every)
    }

    pub fn current_condition(&self) -> Condition {
        self.current
    }

    fn is_due(&self, step: u64) -> bool {
        self.last_refresh
            .map_or(true, |last| step >= last.saturating_add(self.refresh_every))
    }

    /// Refreshes the condition if the interval has elapsed and returns it.
    pub fn update(&mut self, step: u64, rng: &mut dyn RngCore) -> Condition {
        if !self.is_due(step) {
            return self.current;
        }
        self.last_refresh = Some(step);
        self.current = match self.source.fetch().and_then(|payload| parse_payload(&payload)) {
            Ok(condition) => {
                debug!(step, %condition, "Weather refreshed");
                condition
            }
            Err(err) => {
                let fallback = Condition::random(rng);
                warn!(step, %err, %fallback, "Weather unavailable; using random conditions");
                fallback
            }
        };
        self.current
    }
}
