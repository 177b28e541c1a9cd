//! Slot stages for one round of the bottle.
//!
//! Slots move `floating -> activated -> revealed` and never back, except when
//! the whole round is reset. Activation happens once per round; only one slot
//! may ever be revealed per round.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{RevealError, TransitionBlock};
use crate::haptics::{Haptics, VibrationPattern};

/// Animation offset between consecutive slots, in seconds
pub const SLOT_DELAY_STEP_SECS: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Floating,
    Activated,
    Revealed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StorySlot {
    slot_id: usize,
    stage: Stage,
    start_delay: f64,
    assigned_story_index: Option<usize>,
}

impl StorySlot {
    fn new(slot_id: usize, story_index: usize) -> Self {
        Self {
            slot_id,
            stage: Stage::Floating,
            start_delay: slot_id as f64 * SLOT_DELAY_STEP_SECS,
            assigned_story_index: Some(story_index),
        }
    }

    pub fn slot_id(&self) -> usize {
        self.slot_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Seconds after activation before this slot starts moving
    pub fn start_delay(&self) -> f64 {
        self.start_delay
    }

    pub fn assigned_story_index(&self) -> Option<usize> {
        self.assigned_story_index
    }
}

/// Sole owner of slot state; the UI only sees it through these methods
pub struct RevealMachine {
    slots: Vec<StorySlot>,
    activated_at: Option<Instant>,
    revealed: Option<usize>,
    haptics: Haptics,
    clock: Arc<dyn Clock>,
}

impl RevealMachine {
    pub fn new(haptics: Haptics) -> Self {
        Self::with_clock(haptics, Arc::new(SystemClock))
    }

    pub fn with_clock(haptics: Haptics, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Vec::new(),
            activated_at: None,
            revealed: None,
            haptics,
            clock,
        }
    }

    /// Creates `n` floating slots, slot `i` holding `story_indices[i]`.
    /// Calling it again starts a fresh round.
    pub fn initialize_slots(&mut self, n: usize, story_indices: &[usize]) {
        if story_indices.len() < n {
            warn!(
                "asked for {} slots but only {} stories were sampled",
                n,
                story_indices.len()
            );
        }
        self.slots = story_indices
            .iter()
            .take(n)
            .enumerate()
            .map(|(slot_id, &story)| StorySlot::new(slot_id, story))
            .collect();
        self.activated_at = None;
        self.revealed = None;
        debug!("initialized {} slots", self.slots.len());
    }

    /// Wakes every slot at once. Returns `false` when the round was already
    /// activated or has no slots; nothing changes in that case.
    pub fn activate(&mut self) -> bool {
        if self.activated_at.is_some() || self.slots.is_empty() {
            debug!("activation ignored");
            return false;
        }
        // Check and set happen in the same call, never split.
        self.activated_at = Some(self.clock.now());
        for slot in &mut self.slots {
            slot.stage = Stage::Activated;
        }
        info!("bottle activated, {} slots awake", self.slots.len());
        self.haptics.trigger(&VibrationPattern::shake(), false);
        true
    }

    /// Picks slot `slot_id` and yields its story index. First reveal wins.
    pub fn reveal(&mut self, slot_id: usize) -> Result<usize, RevealError> {
        let winner = self.revealed;
        let slot = self
            .slots
            .get_mut(slot_id)
            .ok_or(RevealError::InvalidTransition {
                slot: slot_id,
                reason: TransitionBlock::UnknownSlot,
            })?;

        if let Some(winner) = winner {
            return Err(RevealError::InvalidTransition {
                slot: slot_id,
                reason: TransitionBlock::AlreadyRevealed { winner },
            });
        }
        if slot.stage != Stage::Activated {
            return Err(RevealError::InvalidTransition {
                slot: slot_id,
                reason: TransitionBlock::WrongStage(slot.stage),
            });
        }
        let story = slot.assigned_story_index.ok_or(RevealError::InvalidTransition {
            slot: slot_id,
            reason: TransitionBlock::Unassigned,
        })?;

        slot.stage = Stage::Revealed;
        self.revealed = Some(slot_id);
        info!("slot {} revealed story {}", slot_id, story);
        self.haptics.trigger(&VibrationPattern::success(), false);
        Ok(story)
    }

    /// Back to floating with no assigned stories. Safe at any point.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.stage = Stage::Floating;
            slot.assigned_story_index = None;
        }
        self.activated_at = None;
        self.revealed = None;
        debug!("reveal machine reset");
    }

    pub fn slots(&self) -> &[StorySlot] {
        &self.slots
    }

    pub fn slot(&self, slot_id: usize) -> Option<&StorySlot> {
        self.slots.get(slot_id)
    }

    pub fn is_activated(&self) -> bool {
        self.activated_at.is_some()
    }

    pub fn activated_at(&self) -> Option<Instant> {
        self.activated_at
    }

    pub fn revealed_slot(&self) -> Option<usize> {
        self.revealed
    }

    pub fn haptics(&self) -> &Haptics {
        &self.haptics
    }

    pub fn haptics_mut(&mut self) -> &mut Haptics {
        &mut self.haptics
    }
}

impl std::fmt::Debug for RevealMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealMachine")
            .field("slots", &self.slots)
            .field("activated_at", &self.activated_at)
            .field("revealed", &self.revealed)
            .finish()
    }
}
