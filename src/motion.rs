//! Motion signal detection.
//!
//! Raw accelerometer readings arrive one at a time, in order. A shake is
//! detected when the summed absolute per-axis change against the previous
//! reading exceeds the threshold, then further shakes are suppressed for a
//! fixed window measured from the last emitted shake.

use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::SensorError;

pub const DEFAULT_THRESHOLD: f64 = 15.0;
pub const MIN_SENSITIVITY: f64 = 5.0;
pub const MAX_SENSITIVITY: f64 = 30.0;
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

// Deltas below this are noise and not worth a diagnostic
const DIAGNOSTIC_FLOOR: f64 = 5.0;

/// Accelerometer reading with gravity, in m/s²
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp: Instant,
}

impl MotionSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp: Instant) -> Self {
        Self { x, y, z, timestamp }
    }

    fn deltas(&self, prev: &MotionSample) -> (f64, f64, f64) {
        (
            (self.x - prev.x).abs(),
            (self.y - prev.y).abs(),
            (self.z - prev.z).abs(),
        )
    }
}

/// Reading as the platform delivers it; any axis may be missing
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionReading {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub timestamp: Instant,
}

impl MotionReading {
    pub fn new(x: f64, y: f64, z: f64, timestamp: Instant) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            timestamp,
        }
    }

    /// `None` when an axis is missing or not a finite number
    pub fn into_sample(self) -> Option<MotionSample> {
        let finite = |v: Option<f64>| v.filter(|v| v.is_finite());
        Some(MotionSample {
            x: finite(self.x)?,
            y: finite(self.y)?,
            z: finite(self.z)?,
            timestamp: self.timestamp,
        })
    }
}

/// A shake was detected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShakeEvent;

/// Side-channel for debug displays; never drives application logic
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MotionDiagnostic {
    Status { listening: bool },
    Motion { dx: f64, dy: f64, dz: f64, total: f64 },
    Shake,
}

/// What the device offers for motion sensing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionCapability {
    Unsupported,
    /// Sensors exist but need an explicit consent prompt first
    PermissionRequired,
    Available,
}

/// Platform seam for motion sensors
pub trait MotionSource {
    fn capability(&self) -> MotionCapability;

    /// Shows the consent prompt and reports the user's decision
    fn request_permission(&mut self) -> Result<bool, SensorError>;

    fn subscribe(&mut self) -> Result<(), SensorError>;

    fn unsubscribe(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionStatus {
    pub listening: bool,
    pub threshold: f64,
    pub supported: bool,
}

/// Turns a stream of readings into [`ShakeEvent`]s.
///
/// Owns the sensor subscription: dropping the detector unsubscribes.
pub struct MotionDetector<S: MotionSource> {
    source: S,
    threshold: f64,
    debounce: Duration,
    listening: bool,
    last_sample: Option<MotionSample>,
    last_shake: Option<Instant>,
    shakes: u64,
    diagnostics: Option<Sender<MotionDiagnostic>>,
}

impl<S: MotionSource> MotionDetector<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            threshold: DEFAULT_THRESHOLD,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            listening: false,
            last_sample: None,
            last_shake: None,
            shakes: 0,
            diagnostics: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_diagnostics(mut self, tx: Sender<MotionDiagnostic>) -> Self {
        self.diagnostics = Some(tx);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn capability(&self) -> MotionCapability {
        self.source.capability()
    }

    /// Asks for sensor access. Never fails: errors and refusals read as `false`.
    pub fn request_permission(&mut self) -> bool {
        match self.source.capability() {
            MotionCapability::Unsupported => {
                debug!("motion permission requested but sensors are absent");
                false
            }
            MotionCapability::Available => true,
            MotionCapability::PermissionRequired => match self.source.request_permission() {
                Ok(granted) => {
                    info!("motion permission granted: {}", granted);
                    granted
                }
                Err(err) => {
                    warn!("motion permission request failed: {}", err);
                    false
                }
            },
        }
    }

    /// Subscribes to the sample stream; a no-op while already listening
    pub fn start(&mut self) -> Result<(), SensorError> {
        if self.listening {
            debug!("motion detector already listening");
            return Ok(());
        }
        if let Err(err) = self.source.subscribe() {
            warn!("motion detector failed to start: {}", err);
            return Err(err);
        }
        self.listening = true;
        info!("motion detector listening (threshold {})", self.threshold);
        self.emit(MotionDiagnostic::Status { listening: true });
        Ok(())
    }

    /// Unsubscribes and forgets the retained sample; safe to call repeatedly
    pub fn stop(&mut self) {
        if !self.listening {
            return;
        }
        self.source.unsubscribe();
        self.listening = false;
        self.last_sample = None;
        self.last_shake = None;
        info!("motion detector stopped");
        self.emit(MotionDiagnostic::Status { listening: false });
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Feeds one reading. Readings must be delivered in arrival order.
    pub fn on_reading(&mut self, reading: MotionReading) -> Option<ShakeEvent> {
        if !self.listening {
            return None;
        }
        let Some(sample) = reading.into_sample() else {
            debug!("dropping malformed motion reading");
            return None;
        };
        self.on_sample(sample)
    }

    pub fn on_sample(&mut self, sample: MotionSample) -> Option<ShakeEvent> {
        if !self.listening {
            return None;
        }
        let Some(prev) = self.last_sample.replace(sample) else {
            return None;
        };

        let (dx, dy, dz) = sample.deltas(&prev);
        let total = dx + dy + dz;
        if total > DIAGNOSTIC_FLOOR {
            debug!("motion delta {:.2} ({:.2}, {:.2}, {:.2})", total, dx, dy, dz);
            self.emit(MotionDiagnostic::Motion { dx, dy, dz, total });
        }

        if total > self.threshold {
            self.shake_detected(sample.timestamp)
        } else {
            None
        }
    }

    fn shake_detected(&mut self, at: Instant) -> Option<ShakeEvent> {
        if let Some(last) = self.last_shake {
            if at.saturating_duration_since(last) < self.debounce {
                debug!("shake suppressed by debounce");
                return None;
            }
        }
        self.last_shake = Some(at);
        self.shakes += 1;
        info!("shake detected (#{})", self.shakes);
        self.emit(MotionDiagnostic::Shake);
        Some(ShakeEvent)
    }

    /// Lower is more sensitive. Clamped to `[5, 30]`.
    pub fn set_sensitivity(&mut self, threshold: f64) {
        if threshold.is_nan() {
            return;
        }
        self.threshold = threshold.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
        debug!("motion sensitivity set to {}", self.threshold);
    }

    pub fn sensitivity(&self) -> f64 {
        self.threshold
    }

    pub fn shakes_detected(&self) -> u64 {
        self.shakes
    }

    pub fn status(&self) -> MotionStatus {
        MotionStatus {
            listening: self.listening,
            threshold: self.threshold,
            supported: self.source.capability() != MotionCapability::Unsupported,
        }
    }

    fn emit(&self, diagnostic: MotionDiagnostic) {
        if let Some(tx) = &self.diagnostics {
            // Nobody watching is fine
            let _ = tx.send(diagnostic);
        }
    }
}

impl<S: MotionSource> Drop for MotionDetector<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
