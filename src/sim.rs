//! Keyboard-driven stand-in for a phone accelerometer.
//!
//! Terminals have no motion sensors, so the front-end asks this source for a
//! burst of readings whenever the user presses the shake key.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SensorError;
use crate::motion::{MotionCapability, MotionReading, MotionSource};

const GRAVITY: f64 = 9.81;
const SAMPLE_INTERVAL_MS: u64 = 16;
const BURST_LEN: usize = 12;

/// How the simulated consent prompt resolves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionAnswer {
    Grant,
    Deny,
    /// The prompt itself errors out
    Fail,
}

pub struct SimulatedMotion {
    capability: MotionCapability,
    answer: PermissionAnswer,
    subscribed: bool,
    rng: StdRng,
}

impl SimulatedMotion {
    pub fn new(capability: MotionCapability) -> Self {
        Self {
            capability,
            answer: PermissionAnswer::Grant,
            subscribed: false,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(capability: MotionCapability, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(capability)
        }
    }

    /// Decides what the next consent prompt returns
    pub fn answer_with(&mut self, answer: PermissionAnswer) {
        self.answer = answer;
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// A phone lying still, with a little sensor noise
    pub fn resting(&mut self, at: Instant) -> Option<MotionReading> {
        if !self.subscribed {
            return None;
        }
        let noise = 0.3;
        Some(MotionReading::new(
            self.rng.gen_range(-noise..noise),
            self.rng.gen_range(-noise..noise),
            GRAVITY + self.rng.gen_range(-noise..noise),
            at,
        ))
    }

    /// A vigorous shake: readings swinging hard back and forth, 16ms apart.
    /// Empty while unsubscribed.
    pub fn shake_burst(&mut self, start: Instant) -> Vec<MotionReading> {
        if !self.subscribed {
            return Vec::new();
        }
        (0..BURST_LEN)
            .map(|i| {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                let swing = self.rng.gen_range(8.0..14.0);
                MotionReading::new(
                    sign * swing,
                    -sign * swing * 0.5,
                    GRAVITY + sign * self.rng.gen_range(0.0..3.0),
                    start + Duration::from_millis(SAMPLE_INTERVAL_MS * i as u64),
                )
            })
            .collect()
    }
}

impl MotionSource for SimulatedMotion {
    fn capability(&self) -> MotionCapability {
        self.capability
    }

    fn request_permission(&mut self) -> Result<bool, SensorError> {
        match self.answer {
            PermissionAnswer::Grant => Ok(true),
            PermissionAnswer::Deny => Ok(false),
            PermissionAnswer::Fail => Err(SensorError::PermissionPrompt(
                "prompt dismissed without an answer".into(),
            )),
        }
    }

    fn subscribe(&mut self) -> Result<(), SensorError> {
        if self.capability == MotionCapability::Unsupported {
            return Err(SensorError::Unavailable);
        }
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionDetector;

    #[test]
    fn burst_is_empty_until_subscribed() {
        let mut sim = SimulatedMotion::seeded(MotionCapability::Available, 7);
        assert!(sim.shake_burst(Instant::now()).is_empty());
        assert!(sim.resting(Instant::now()).is_none());

        sim.subscribe().unwrap();
        assert_eq!(sim.shake_burst(Instant::now()).len(), BURST_LEN);
    }

    #[test]
    fn one_burst_is_exactly_one_shake() {
        let source = SimulatedMotion::seeded(MotionCapability::Available, 42);
        let mut detector = MotionDetector::new(source);
        detector.start().unwrap();

        let t0 = Instant::now();
        let burst = detector.source_mut().shake_burst(t0);
        let shakes = burst
            .into_iter()
            .filter_map(|r| detector.on_reading(r))
            .count();
        assert_eq!(shakes, 1);
    }

    #[test]
    fn resting_phone_never_shakes() {
        let source = SimulatedMotion::seeded(MotionCapability::Available, 3);
        let mut detector = MotionDetector::new(source);
        detector.start().unwrap();

        let t0 = Instant::now();
        for i in 0..200u64 {
            let reading = detector
                .source_mut()
                .resting(t0 + Duration::from_millis(16 * i))
                .unwrap();
            assert!(detector.on_reading(reading).is_none());
        }
    }

    #[test]
    fn unsupported_sensor_refuses_subscription() {
        let mut sim = SimulatedMotion::new(MotionCapability::Unsupported);
        assert_eq!(sim.subscribe(), Err(SensorError::Unavailable));
    }

    #[test]
    fn scripted_permission_answers() {
        let mut sim = SimulatedMotion::new(MotionCapability::PermissionRequired);
        assert_eq!(sim.request_permission(), Ok(true));
        sim.answer_with(PermissionAnswer::Deny);
        assert_eq!(sim.request_permission(), Ok(false));
        sim.answer_with(PermissionAnswer::Fail);
        assert!(sim.request_permission().is_err());
    }
}
