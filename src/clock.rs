//! Simulation wall clock.
//!
//! One step advances the clock by a fixed number of minutes. Plants read the
//! hour to decide whether they are inside their growth window.

use serde::{Deserialize, Serialize};

pub const MINUTES_PER_HOUR: u32 = 60;
pub const HOURS_PER_DAY: u32 = 24;

const DAYBREAK_HOUR: u32 = 6;
const NIGHTFALL_HOUR: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    hour: u32,
    minute: u32,
    days: u64,
    minutes_per_step: u32,
}

impl Clock {
    /// Start at `hour:minute` on day zero. Out-of-range inputs are folded back
    /// into range so the clock is always normalized.
    pub fn new(hour: u32, minute: u32, minutes_per_step: u32) -> Self {
        let mut clock = Self {
            hour,
            minute,
            days: 0,
            minutes_per_step,
        };
        clock.normalize();
        clock.days = 0;
        clock
    }

    pub fn advance(&mut self) {
        self.minute += self.minutes_per_step;
        self.normalize();
    }

    fn normalize(&mut self) {
        self.hour += self.minute / MINUTES_PER_HOUR;
        self.days += u64::from(self.hour / HOURS_PER_DAY);
        self.minute %= MINUTES_PER_HOUR;
        self.hour %= HOURS_PER_DAY;
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn days(&self) -> u64 {
        self.days
    }

    pub fn minutes_per_step(&self) -> u32 {
        self.minutes_per_step
    }

    pub fn is_day(&self) -> bool {
        (DAYBREAK_HOUR..NIGHTFALL_HOUR).contains(&self.hour)
    }

    pub fn is_night(&self) -> bool {
        !self.is_day()
    }

    /// `HH:MM`
    pub fn formatted(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(17, 0, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_carries_minutes_into_hours() {
        let mut clock = Clock::new(17, 50, 10);
        clock.advance();
        assert_eq!((clock.hour(), clock.minute()), (18, 0));
        assert_eq!(clock.days(), 0);
    }

    #[test]
    fn advance_rolls_over_midnight() {
        let mut clock = Clock::new(23, 0, 60);
        clock.advance();
        assert_eq!(clock.hour(), 0);
        assert_eq!(clock.days(), 1);

        let mut fast = Clock::new(0, 0, 60 * 30);
        fast.advance();
        assert_eq!(fast.hour(), 6);
        assert_eq!(fast.days(), 1);
    }

    #[test]
    fn new_folds_out_of_range_start() {
        let clock = Clock::new(25, 75, 10);
        assert_eq!((clock.hour(), clock.minute()), (2, 15));
        assert_eq!(clock.days(), 0);
    }

    #[test]
    fn day_is_six_until_eighteen() {
        assert!(Clock::new(6, 0, 10).is_day());
        assert!(Clock::new(17, 59, 10).is_day());
        assert!(Clock::new(18, 0, 10).is_night());
        assert!(Clock::new(5, 59, 10).is_night());
    }

    #[test]
    fn formatted_pads_fields() {
        assert_eq!(Clock::new(7, 5, 10).formatted(), "07:05");
    }
}
