//! Vibration adapter: capability probe plus a rate-limited trigger.
//!
//! Haptics never gate logic. A failed or suppressed vibration is reported as
//! `false` and otherwise ignored by callers.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::clock::{Clock, SystemClock};

pub const DEFAULT_COOLDOWN_MS: u64 = 200;

/// Named on/off sequence in milliseconds, starting with "on"
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VibrationPattern {
    name: &'static str,
    steps: &'static [u32],
}

impl VibrationPattern {
    const fn preset(name: &'static str, steps: &'static [u32]) -> Self {
        Self { name, steps }
    }

    pub fn tap() -> Self {
        Self::preset("tap", &[10])
    }

    pub fn medium() -> Self {
        Self::preset("medium", &[20])
    }

    pub fn strong() -> Self {
        Self::preset("strong", &[50])
    }

    /// Bottle shake: eight tapering pulses over 660ms
    pub fn shake() -> Self {
        Self::preset(
            "shake",
            &[40, 60, 40, 60, 40, 60, 40, 60, 40, 60, 30, 40, 30, 40, 20],
        )
    }

    /// Soft double pulse played when a story is picked
    pub fn success() -> Self {
        Self::preset("success", &[30, 80, 30])
    }

    pub fn error() -> Self {
        Self::preset("error", &[50, 100, 50, 100, 50])
    }

    pub fn rhythm() -> Self {
        Self::preset("rhythm", &[20, 80, 20, 80, 20, 80, 20])
    }

    /// Cancels any running vibration
    pub fn stop() -> Self {
        Self::preset("stop", &[0])
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn steps(&self) -> &[u32] {
        self.steps
    }

    /// Sum of every on and off step
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.steps.iter().map(|&ms| ms as u64).sum())
    }

    /// Durations of the "on" steps only
    pub fn pulses(&self) -> impl Iterator<Item = u32> + '_ {
        self.steps.iter().step_by(2).copied().filter(|&ms| ms > 0)
    }
}

/// Coarse guess at the platform family, used only for diagnostics
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum PlatformFamily {
    #[strum(serialize = "iOS")]
    Ios,
    Android,
    Desktop,
    Unknown,
}

impl PlatformFamily {
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "ios" => PlatformFamily::Ios,
            "android" => PlatformFamily::Android,
            "linux" | "macos" | "windows" | "freebsd" | "netbsd" | "openbsd" => {
                PlatformFamily::Desktop
            }
            _ => PlatformFamily::Unknown,
        }
    }
}

/// Platform haptic API. `vibrate` is fire-and-forget apart from its success flag.
pub trait HapticDevice: Send {
    fn is_supported(&self) -> bool;

    fn platform(&self) -> PlatformFamily {
        PlatformFamily::detect()
    }

    fn vibrate(&mut self, pattern: &VibrationPattern) -> bool;
}

/// Device without any vibration capability
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHaptics;

impl HapticDevice for NoHaptics {
    fn is_supported(&self) -> bool {
        false
    }

    fn vibrate(&mut self, _pattern: &VibrationPattern) -> bool {
        false
    }
}

/// Terminal stand-in for a vibration motor: one bell per pulse
pub struct TerminalBell<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> HapticDevice for TerminalBell<W> {
    fn is_supported(&self) -> bool {
        true
    }

    fn platform(&self) -> PlatformFamily {
        PlatformFamily::Desktop
    }

    fn vibrate(&mut self, pattern: &VibrationPattern) -> bool {
        let bells = pattern.pulses().count();
        if bells == 0 {
            return true;
        }
        let rung = "\x07".repeat(bells);
        self.out
            .write_all(rung.as_bytes())
            .and_then(|_| self.out.flush())
            .is_ok()
    }
}

/// Records every pattern it is asked to play; clones share the log
#[derive(Clone, Debug)]
pub struct RecordingHaptics {
    played: Arc<Mutex<Vec<VibrationPattern>>>,
    supported: bool,
    accept: bool,
    platform: PlatformFamily,
}

impl RecordingHaptics {
    pub fn new() -> Self {
        Self {
            played: Arc::new(Mutex::new(Vec::new())),
            supported: true,
            accept: true,
            platform: PlatformFamily::Android,
        }
    }

    /// A device that has the API but silently refuses every request
    pub fn ignoring() -> Self {
        Self {
            accept: false,
            platform: PlatformFamily::Ios,
            ..Self::new()
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn played(&self) -> Vec<VibrationPattern> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn played_names(&self) -> Vec<String> {
        self.played()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }
}

impl Default for RecordingHaptics {
    fn default() -> Self {
        Self::new()
    }
}

impl HapticDevice for RecordingHaptics {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn platform(&self) -> PlatformFamily {
        self.platform
    }

    fn vibrate(&mut self, pattern: &VibrationPattern) -> bool {
        if !self.supported {
            return false;
        }
        if let Ok(mut played) = self.played.lock() {
            played.push(pattern.clone());
        }
        self.accept
    }
}

/// Read-only view for developer debug displays
#[derive(Clone, Debug, PartialEq)]
pub struct HapticsSnapshot {
    pub supported: bool,
    pub platform: PlatformFamily,
    pub last_trigger: Option<Instant>,
    pub remaining_cooldown: Duration,
    pub note: &'static str,
}

/// Rate-limited front for a [`HapticDevice`].
///
/// The cooldown is shared by every pattern: a `success` right after a
/// `shake` is suppressed unless the caller bypasses the cooldown.
pub struct Haptics {
    device: Box<dyn HapticDevice>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    last_trigger: Option<Instant>,
}

impl Haptics {
    pub fn new(device: impl HapticDevice + 'static) -> Self {
        Self::with_clock(device, Arc::new(SystemClock))
    }

    pub fn with_clock(device: impl HapticDevice + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            device: Box::new(device),
            clock,
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            last_trigger: None,
        }
    }

    pub fn disabled() -> Self {
        Self::new(NoHaptics)
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn is_supported(&self) -> bool {
        self.device.is_supported()
    }

    /// Plays `pattern` unless unsupported, cooling down, or refused by the device
    pub fn trigger(&mut self, pattern: &VibrationPattern, ignore_cooldown: bool) -> bool {
        if !self.device.is_supported() {
            debug!("vibration '{}' skipped: unsupported", pattern.name());
            return false;
        }

        let now = self.clock.now();
        if !ignore_cooldown && !self.cooldown_remaining(now).is_zero() {
            debug!("vibration '{}' suppressed by cooldown", pattern.name());
            return false;
        }

        let fired = self.device.vibrate(pattern);
        if fired {
            self.last_trigger = Some(now);
            info!("vibration '{}' fired", pattern.name());
        } else {
            debug!("vibration '{}' refused by device", pattern.name());
        }
        fired
    }

    pub fn stop(&mut self) -> bool {
        self.trigger(&VibrationPattern::stop(), true)
    }

    fn cooldown_remaining(&self, now: Instant) -> Duration {
        match self.last_trigger {
            Some(last) => self
                .cooldown
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn snapshot(&self) -> HapticsSnapshot {
        let supported = self.device.is_supported();
        let platform = self.device.platform();
        let note = match (supported, platform) {
            (_, PlatformFamily::Ios) => "iOS ignores vibration requests",
            (false, _) => "this device or terminal has no vibration support",
            (true, PlatformFamily::Android) => "vibration feedback supported",
            (true, _) => "haptics rendered as terminal bell",
        };
        HapticsSnapshot {
            supported,
            platform,
            last_trigger: self.last_trigger,
            remaining_cooldown: self.cooldown_remaining(self.clock.now()),
            note,
        }
    }
}

impl std::fmt::Debug for Haptics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Haptics")
            .field("supported", &self.device.is_supported())
            .field("cooldown", &self.cooldown)
            .field("last_trigger", &self.last_trigger)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn haptics_with(device: RecordingHaptics) -> (Haptics, ManualClock) {
        let clock = ManualClock::new();
        let haptics = Haptics::with_clock(device, Arc::new(clock.clone()));
        (haptics, clock)
    }

    #[test]
    fn trigger_respects_shared_cooldown() {
        let device = RecordingHaptics::new();
        let (mut haptics, clock) = haptics_with(device.clone());

        assert!(haptics.trigger(&VibrationPattern::shake(), false));
        clock.advance_ms(150);
        assert!(!haptics.trigger(&VibrationPattern::success(), false));
        clock.advance_ms(50);
        assert!(haptics.trigger(&VibrationPattern::success(), false));

        assert_eq!(device.played_names(), vec!["shake", "success"]);
    }

    #[test]
    fn ignore_cooldown_bypasses_limiter() {
        let device = RecordingHaptics::new();
        let (mut haptics, _clock) = haptics_with(device.clone());

        assert!(haptics.trigger(&VibrationPattern::tap(), false));
        assert!(haptics.trigger(&VibrationPattern::tap(), true));
        assert_eq!(device.played().len(), 2);
    }

    #[test]
    fn unsupported_device_returns_false() {
        let (mut haptics, _clock) = haptics_with(RecordingHaptics::unsupported());
        assert!(!haptics.is_supported());
        assert!(!haptics.trigger(&VibrationPattern::shake(), true));
        assert!(!haptics.snapshot().supported);
    }

    #[test]
    fn silently_ignoring_device_reports_failure_without_cooldown() {
        let device = RecordingHaptics::ignoring();
        let (mut haptics, _clock) = haptics_with(device.clone());

        assert!(!haptics.trigger(&VibrationPattern::shake(), false));
        // The refused call never armed the cooldown
        assert!(haptics.snapshot().last_trigger.is_none());
        assert_eq!(device.played().len(), 1);
        assert_eq!(haptics.snapshot().note, "iOS ignores vibration requests");
    }

    #[test]
    fn snapshot_reports_remaining_cooldown() {
        let (mut haptics, clock) = haptics_with(RecordingHaptics::new());
        assert_eq!(haptics.snapshot().remaining_cooldown, Duration::ZERO);

        haptics.trigger(&VibrationPattern::tap(), false);
        clock.advance_ms(120);
        let snap = haptics.snapshot();
        assert_eq!(snap.remaining_cooldown, Duration::from_millis(80));
        assert!(snap.last_trigger.is_some());
        assert_eq!(snap.platform, PlatformFamily::Android);
    }

    #[test]
    fn shake_pattern_is_eight_pulses_over_660ms() {
        let shake = VibrationPattern::shake();
        assert_eq!(shake.total_duration(), Duration::from_millis(660));
        assert_eq!(shake.pulses().count(), 8);
        assert_eq!(VibrationPattern::stop().pulses().count(), 0);
    }

    #[test]
    fn error_and_rhythm_presets() {
        let error = VibrationPattern::error();
        assert_eq!(error.name(), "error");
        assert_eq!(error.steps(), &[50, 100, 50, 100, 50]);
        assert_eq!(error.pulses().collect::<Vec<_>>(), vec![50, 50, 50]);

        let rhythm = VibrationPattern::rhythm();
        assert_eq!(rhythm.pulses().count(), 4);
        assert_eq!(rhythm.total_duration(), Duration::from_millis(320));
    }

    #[test]
    fn terminal_bell_rings_once_per_pulse() {
        let mut buf = Vec::new();
        {
            let mut bell = TerminalBell::new(&mut buf);
            assert!(bell.vibrate(&VibrationPattern::success()));
        }
        assert_eq!(buf, b"\x07\x07");
    }

    #[test]
    fn platform_family_from_os() {
        assert_eq!(PlatformFamily::from_os("ios"), PlatformFamily::Ios);
        assert_eq!(PlatformFamily::from_os("android"), PlatformFamily::Android);
        assert_eq!(PlatformFamily::from_os("linux"), PlatformFamily::Desktop);
        assert_eq!(PlatformFamily::from_os("plan9"), PlatformFamily::Unknown);
        assert_eq!(PlatformFamily::Ios.to_string(), "iOS");
    }
}
