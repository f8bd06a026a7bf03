//! Clock and random implementations.

use crate::infrastructure::ports::{ClockPort, RandomPort};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        use rand::Rng;
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Scripted random for testing: yields the given faces in order, then repeats
/// the last one. Values are clamped into the requested range.
#[cfg(test)]
pub struct ScriptedRandom {
    faces: std::sync::Mutex<std::collections::VecDeque<i32>>,
    last: std::sync::Mutex<i32>,
}

#[cfg(test)]
impl ScriptedRandom {
    pub fn new(faces: &[i32]) -> Self {
        Self {
            faces: std::sync::Mutex::new(faces.iter().copied().collect()),
            last: std::sync::Mutex::new(faces.last().copied().unwrap_or(1)),
        }
    }
}

#[cfg(test)]
impl RandomPort for ScriptedRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        let next = self.faces.lock().unwrap().pop_front();
        let value = match next {
            Some(v) => {
                *self.last.lock().unwrap() = v;
                v
            }
            None => *self.last.lock().unwrap(),
        };
        value.clamp(min, max)
    }

    fn gen_uuid(&self) -> Uuid {
        Uuid::nil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_random_stays_in_range() {
        let random = SystemRandom::new();
        for _ in 0..200 {
            let value = random.gen_range(1, 6);
            assert!((1..=6).contains(&value));
        }
        assert_eq!(random.gen_range(4, 4), 4);
    }

    #[test]
    fn scripted_random_repeats_last_face() {
        let random = ScriptedRandom::new(&[3, 17]);
        assert_eq!(random.gen_range(1, 20), 3);
        assert_eq!(random.gen_range(1, 20), 17);
        assert_eq!(random.gen_range(1, 20), 17);
        assert_eq!(random.gen_range(1, 6), 6);
    }
}
