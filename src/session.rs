//! One screenful of bottle: the piece that wires input, detection, reveal
//! state and the story sample together.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::corpus::{Corpus, StoryNote};
use crate::error::RevealError;
use crate::footprints::Footprints;
use crate::haptics::Haptics;
use crate::input_policy::{ActivationSource, InputModality, InputPolicy};
use crate::map_feed::MapFeed;
use crate::motion::{MotionDetector, MotionDiagnostic, MotionReading, MotionSource};
use crate::reveal::{RevealMachine, StorySlot};
use crate::selector::{SelectedStory, StorySelector};
use crate::sim::{PermissionAnswer, SimulatedMotion};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub slot_count: usize,
    pub preview_chars: usize,
    pub sensitivity: f64,
    pub shake_debounce: Duration,
    pub dev_mode: bool,
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            slot_count: cfg.slot_count,
            preview_chars: cfg.preview_chars,
            sensitivity: cfg.sensitivity,
            shake_debounce: Duration::from_millis(cfg.shake_debounce_ms),
            dev_mode: cfg.dev_mode,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

pub struct ShakeSession<S: MotionSource> {
    config: SessionConfig,
    policy: InputPolicy,
    detector: MotionDetector<S>,
    machine: RevealMachine,
    selector: StorySelector,
    corpus: Corpus,
    selected: Vec<SelectedStory>,
    footprints: Footprints,
    clock: Arc<dyn Clock>,
    mounted: bool,
}

impl<S: MotionSource> ShakeSession<S> {
    pub fn new(source: S, corpus: Corpus, haptics: Haptics, config: SessionConfig) -> Self {
        Self::with_clock(source, corpus, haptics, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: S,
        corpus: Corpus,
        haptics: Haptics,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut detector = MotionDetector::new(source).with_debounce(config.shake_debounce);
        detector.set_sensitivity(config.sensitivity);
        let policy = InputPolicy::probe(detector.capability(), config.dev_mode);
        Self {
            selector: StorySelector::new(corpus.len()),
            machine: RevealMachine::with_clock(haptics, clock.clone()),
            policy,
            detector,
            corpus,
            selected: Vec::new(),
            footprints: Footprints::new(),
            clock,
            config,
            mounted: false,
        }
    }

    /// Replaces the story sampler, e.g. with a seeded one
    pub fn with_selector(mut self, selector: StorySelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_diagnostics(mut self, tx: Sender<MotionDiagnostic>) -> Self {
        self.detector = self.detector.with_diagnostics(tx);
        self
    }

    /// Probes input, samples a round of stories and starts listening when
    /// motion is already allowed. Mounting twice is a no-op.
    pub fn mount(&mut self) -> InputModality {
        if self.mounted {
            return self.policy.modality();
        }
        self.policy = InputPolicy::probe(self.detector.capability(), self.config.dev_mode);
        self.new_round();
        if self.policy.motion_enabled() {
            self.start_listening();
        }
        self.mounted = true;
        info!("session mounted, input {}", self.policy.modality());
        self.policy.modality()
    }

    /// Runs the consent prompt while it is pending. Never re-prompts after
    /// an answer; later calls just report whether motion is live.
    pub fn request_permission(&mut self) -> bool {
        if !self.policy.awaiting_permission() {
            debug!("permission already settled ({})", self.policy.modality());
            return self.policy.motion_enabled();
        }
        let granted = self.detector.request_permission();
        self.policy.permission_resolved(granted);
        if granted {
            self.start_listening();
        }
        self.policy.motion_enabled()
    }

    /// Feeds one reading; `true` when it woke the bottle
    pub fn on_motion(&mut self, reading: MotionReading) -> bool {
        if !self.policy.motion_enabled() {
            return false;
        }
        match self.detector.on_reading(reading) {
            Some(_) => self.activate(ActivationSource::Shake),
            None => false,
        }
    }

    /// Tap on the bottle; `true` when it woke the bottle
    pub fn tap(&mut self) -> bool {
        self.activate(ActivationSource::Tap)
    }

    /// Reveals `slot` and adds its story to the footprints
    pub fn pick(&mut self, slot: usize) -> Result<usize, RevealError> {
        let story = self.machine.reveal(slot)?;
        if self.footprints.record(story, Local::now()) {
            debug!("story {} added to footprints", story);
        }
        Ok(story)
    }

    /// Starts a fresh round with a new sample of stories
    pub fn reset(&mut self) {
        self.machine.reset();
        self.new_round();
        info!("session reset");
    }

    pub fn unmount(&mut self) {
        self.detector.stop();
        self.mounted = false;
        info!("session unmounted");
    }

    fn activate(&mut self, source: ActivationSource) -> bool {
        if !self.policy.accepts(source) {
            debug!("{} ignored under {}", source, self.policy.modality());
            return false;
        }
        let woke = self.machine.activate();
        if woke {
            info!("bottle woken by {}", source);
        }
        woke
    }

    fn start_listening(&mut self) {
        if self.detector.start().is_err() {
            self.policy.motion_failed();
        }
    }

    fn new_round(&mut self) {
        self.selected = self
            .selector
            .pick(&self.corpus, self.config.slot_count, self.config.preview_chars);
        let indices: Vec<usize> = self.selected.iter().map(|s| s.index).collect();
        self.machine.initialize_slots(self.config.slot_count, &indices);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn policy(&self) -> &InputPolicy {
        &self.policy
    }

    pub fn modality(&self) -> InputModality {
        self.policy.modality()
    }

    pub fn prompt(&self) -> &'static str {
        self.policy.prompt()
    }

    /// The denial notice, handed out once
    pub fn take_notice(&mut self) -> Option<&'static str> {
        self.policy.take_notice()
    }

    pub fn detector(&self) -> &MotionDetector<S> {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut MotionDetector<S> {
        &mut self.detector
    }

    pub fn machine(&self) -> &RevealMachine {
        &self.machine
    }

    pub fn haptics_mut(&mut self) -> &mut Haptics {
        self.machine.haptics_mut()
    }

    pub fn slots(&self) -> &[StorySlot] {
        self.machine.slots()
    }

    pub fn selected(&self) -> &[SelectedStory] {
        &self.selected
    }

    /// Label for a slot, while it still holds its story
    pub fn selected_for_slot(&self, slot: usize) -> Option<&SelectedStory> {
        let index = self.machine.slot(slot)?.assigned_story_index()?;
        self.selected.iter().find(|s| s.index == index)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn story(&self, index: usize) -> Option<&StoryNote> {
        self.corpus.get_or_first(index)
    }

    pub fn footprints(&self) -> &Footprints {
        &self.footprints
    }

    /// Seconds since the bottle woke, for animation timing
    pub fn since_activation(&self) -> Option<f64> {
        self.machine
            .activated_at()
            .map(|at| self.clock.now().saturating_duration_since(at).as_secs_f64())
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn map_feed(&self) -> MapFeed {
        MapFeed::for_corpus(&self.corpus)
    }

    pub fn footprint_feed(&self) -> MapFeed {
        MapFeed::from_points(self.footprints.map_points(&self.corpus))
    }
}

/// Keyboard-simulated sensors
impl ShakeSession<SimulatedMotion> {
    /// Answers the pending consent prompt on the user's behalf
    pub fn answer_prompt(&mut self, answer: PermissionAnswer) -> bool {
        self.detector.source_mut().answer_with(answer);
        self.request_permission()
    }

    /// Readings for one vigorous shake, stamped from now.
    /// Empty unless the simulated sensor is subscribed.
    pub fn shake_burst(&mut self) -> Vec<MotionReading> {
        let now = self.clock.now();
        self.detector.source_mut().shake_burst(now)
    }

    pub fn resting_reading(&mut self) -> Option<MotionReading> {
        let now = self.clock.now();
        self.detector.source_mut().resting(now)
    }
}
