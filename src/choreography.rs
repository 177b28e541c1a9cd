//! When things appear on screen after the bottle wakes.
//!
//! Everything here is a pure function of elapsed seconds. The reveal state
//! machine decides what is *allowed*; this only decides what is *visible*.

use std::time::Instant;

/// Bottle shake after activation
pub const SHAKE_SECS: f64 = 1.0;
/// Slots leave the bottle through the neck this long after their start delay
pub const RISE_OFFSET_SECS: f64 = 2.0;
pub const RISE_SECS: f64 = 2.5;
/// Slots begin arriving at screen center
pub const ARRIVAL_OFFSET_SECS: f64 = 3.5;
pub const ARRIVAL_SECS: f64 = 1.5;
/// Slot label (emotion tag + preview) fades in
pub const LABEL_OFFSET_SECS: f64 = 4.2;
pub const LABEL_FADE_SECS: f64 = 0.8;
/// "tap a star to reveal your story" shows once every slot has landed
pub const HINT_SECS: f64 = 5.5;
/// Picked slot glows, then the screen fills before the story opens
pub const GLOW_SECS: f64 = 0.8;
pub const FILL_SECS: f64 = 1.5;

// Bottle sway keyframes, evenly spaced over SHAKE_SECS
const SHAKE_KEYFRAMES: [f64; 8] = [0.0, -1.0, 1.0, -1.0, 1.0, -0.5, 0.5, 0.0];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BottlePhase {
    /// Not activated; stars float inside
    Idle,
    Shaking { progress: f64 },
    /// Stars are on their way out
    Emptying,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SlotPhase {
    InBottle,
    Rising { progress: f64 },
    Arriving { progress: f64 },
    Arrived,
}

impl SlotPhase {
    /// Whether the slot is on screen and could sensibly be tapped
    pub fn is_visible(&self) -> bool {
        matches!(self, SlotPhase::Arriving { .. } | SlotPhase::Arrived { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickPhase {
    Glow { progress: f64 },
    Fill { progress: f64 },
    Done,
}

fn progress(elapsed: f64, start: f64, duration: f64) -> f64 {
    ((elapsed - start) / duration).clamp(0.0, 1.0)
}

pub fn bottle_phase(since_activation: Option<f64>) -> BottlePhase {
    match since_activation {
        None => BottlePhase::Idle,
        Some(t) if t < SHAKE_SECS => BottlePhase::Shaking {
            progress: progress(t, 0.0, SHAKE_SECS),
        },
        Some(_) => BottlePhase::Emptying,
    }
}

/// Horizontal sway of the bottle in `[-1, 1]`, zero outside the shake
pub fn shake_offset(since_activation: f64) -> f64 {
    if !(0.0..SHAKE_SECS).contains(&since_activation) {
        return 0.0;
    }
    let segments = (SHAKE_KEYFRAMES.len() - 1) as f64;
    let pos = since_activation / SHAKE_SECS * segments;
    let i = pos.floor() as usize;
    let frac = pos - i as f64;
    let a = SHAKE_KEYFRAMES[i];
    let b = SHAKE_KEYFRAMES[(i + 1).min(SHAKE_KEYFRAMES.len() - 1)];
    a + (b - a) * frac
}

pub fn hint_visible(since_activation: f64) -> bool {
    since_activation >= HINT_SECS
}

/// Timeline of one slot, offset by its start delay
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotTimeline {
    pub start_delay: f64,
}

impl SlotTimeline {
    pub fn new(start_delay: f64) -> Self {
        Self { start_delay }
    }

    pub fn arrival_at(&self) -> f64 {
        self.start_delay + ARRIVAL_OFFSET_SECS
    }

    pub fn label_at(&self) -> f64 {
        self.start_delay + LABEL_OFFSET_SECS
    }

    pub fn phase(&self, since_activation: f64) -> SlotPhase {
        let rise_at = self.start_delay + RISE_OFFSET_SECS;
        let t = since_activation;
        if t < rise_at {
            SlotPhase::InBottle
        } else if t < self.arrival_at() {
            SlotPhase::Rising {
                progress: progress(t, rise_at, RISE_SECS),
            }
        } else if t < self.arrival_at() + ARRIVAL_SECS {
            SlotPhase::Arriving {
                progress: progress(t, self.arrival_at(), ARRIVAL_SECS),
            }
        } else {
            SlotPhase::Arrived
        }
    }

    /// Label fade-in, independent of the arrival motion
    pub fn label_opacity(&self, since_activation: f64) -> f64 {
        progress(since_activation, self.label_at(), LABEL_FADE_SECS)
    }
}

/// Glow-then-fill transition played after a slot is picked
#[derive(Clone, Copy, Debug)]
pub struct PickTransition {
    pub slot: usize,
    pub story_index: usize,
    started_at: Instant,
}

impl PickTransition {
    pub fn start(slot: usize, story_index: usize, now: Instant) -> Self {
        Self {
            slot,
            story_index,
            started_at: now,
        }
    }

    pub fn phase(&self, now: Instant) -> PickPhase {
        let t = now.saturating_duration_since(self.started_at).as_secs_f64();
        if t < GLOW_SECS {
            PickPhase::Glow {
                progress: progress(t, 0.0, GLOW_SECS),
            }
        } else if t < GLOW_SECS + FILL_SECS {
            PickPhase::Fill {
                progress: progress(t, GLOW_SECS, FILL_SECS),
            }
        } else {
            PickPhase::Done
        }
    }

    pub fn is_done(&self, now: Instant) -> bool {
        self.phase(now) == PickPhase::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn bottle_shakes_for_one_second() {
        assert_eq!(bottle_phase(None), BottlePhase::Idle);
        assert_eq!(bottle_phase(Some(0.5)), BottlePhase::Shaking { progress: 0.5 });
        assert_eq!(bottle_phase(Some(1.0)), BottlePhase::Emptying);
    }

    #[test]
    fn shake_offset_follows_keyframes() {
        assert_eq!(shake_offset(0.0), 0.0);
        let one_segment = SHAKE_SECS / 7.0;
        assert!((shake_offset(one_segment) + 1.0).abs() < 1e-9);
        assert!((shake_offset(one_segment * 1.5)).abs() < 1e-9);
        assert_eq!(shake_offset(2.0), 0.0);
        assert_eq!(shake_offset(-1.0), 0.0);
    }

    #[test]
    fn slots_arrive_staggered_by_start_delay() {
        let first = SlotTimeline::new(0.0);
        let third = SlotTimeline::new(1.0);
        assert_eq!(first.arrival_at(), 3.5);
        assert_eq!(third.arrival_at(), 4.5);
        assert_eq!(third.label_at(), 5.2);

        assert_eq!(first.phase(1.0), SlotPhase::InBottle);
        assert!(matches!(first.phase(2.5), SlotPhase::Rising { .. }));
        assert_eq!(first.phase(4.25), SlotPhase::Arriving { progress: 0.5 });
        assert!(first.phase(4.25).is_visible());
        assert!(!third.phase(4.25).is_visible());
    }

    #[test]
    fn label_fades_in_while_still_arriving() {
        let slot = SlotTimeline::new(0.0);
        assert_eq!(slot.label_opacity(4.0), 0.0);
        assert!(matches!(slot.phase(4.2), SlotPhase::Arriving { .. }));
        assert_eq!(slot.label_opacity(4.2), 0.0);
        assert!(matches!(slot.phase(4.6), SlotPhase::Arriving { .. }));
        assert!((slot.label_opacity(4.6) - 0.5).abs() < 1e-9);
        assert!((slot.label_opacity(5.0) - 1.0).abs() < 1e-9);
        assert_eq!(slot.phase(5.0), SlotPhase::Arrived);

        let delayed = SlotTimeline::new(0.5);
        assert!((delayed.label_opacity(5.1) - 0.5).abs() < 1e-9);
        assert!((delayed.label_opacity(5.5) - 1.0).abs() < 1e-9);
        assert_eq!(delayed.label_opacity(30.0), 1.0);
    }

    #[test]
    fn hint_after_all_slots_land() {
        assert!(!hint_visible(5.0));
        assert!(hint_visible(HINT_SECS));
    }

    #[test]
    fn pick_transition_glows_then_fills() {
        let t0 = Instant::now();
        let pick = PickTransition::start(1, 7, t0);
        assert!(matches!(pick.phase(t0), PickPhase::Glow { .. }));
        assert!(matches!(
            pick.phase(t0 + Duration::from_millis(1000)),
            PickPhase::Fill { .. }
        ));
        assert!(pick.is_done(t0 + Duration::from_millis(2300)));
        assert_eq!(pick.story_index, 7);
    }
}
