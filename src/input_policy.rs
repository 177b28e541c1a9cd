//! Which input channel may wake the bottle.
//!
//! Exactly one of shake or tap is live at a time, so the single activation
//! can never be raced by two channels.

use log::info;

use crate::motion::MotionCapability;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "camelCase")]
pub enum InputModality {
    /// Waiting on the consent prompt; neither channel is live
    PendingPermission,
    MotionActive,
    TapActive,
    /// No motion sensors; tap for the rest of the session
    Unsupported,
}

/// Where an activation request came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ActivationSource {
    Shake,
    Tap,
}

pub const DENIED_NOTICE: &str = "Motion access was not granted, tap the bottle instead";

#[derive(Debug, Clone)]
pub struct InputPolicy {
    modality: InputModality,
    dev_mode: bool,
    notice: Option<&'static str>,
}

impl InputPolicy {
    /// Initial modality from the device capability.
    /// `dev_mode` forces tap input and keeps sensors off.
    pub fn probe(capability: MotionCapability, dev_mode: bool) -> Self {
        let modality = if dev_mode {
            InputModality::TapActive
        } else {
            match capability {
                MotionCapability::Unsupported => InputModality::Unsupported,
                MotionCapability::PermissionRequired => InputModality::PendingPermission,
                MotionCapability::Available => InputModality::MotionActive,
            }
        };
        info!("input modality: {} (dev mode: {})", modality, dev_mode);
        Self {
            modality,
            dev_mode,
            notice: None,
        }
    }

    pub fn modality(&self) -> InputModality {
        self.modality
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub fn awaiting_permission(&self) -> bool {
        self.modality == InputModality::PendingPermission
    }

    pub fn motion_enabled(&self) -> bool {
        self.modality == InputModality::MotionActive
    }

    pub fn tap_enabled(&self) -> bool {
        matches!(
            self.modality,
            InputModality::TapActive | InputModality::Unsupported
        )
    }

    pub fn accepts(&self, source: ActivationSource) -> bool {
        match source {
            ActivationSource::Shake => self.motion_enabled(),
            ActivationSource::Tap => self.tap_enabled(),
        }
    }

    /// Applies the consent outcome. Only meaningful while pending; a denial
    /// switches to tap for good and queues a one-time notice.
    pub fn permission_resolved(&mut self, granted: bool) -> InputModality {
        if self.modality != InputModality::PendingPermission {
            return self.modality;
        }
        self.modality = if granted {
            InputModality::MotionActive
        } else {
            self.notice = Some(DENIED_NOTICE);
            InputModality::TapActive
        };
        info!("permission resolved, input modality now {}", self.modality);
        self.modality
    }

    /// Motion listening failed after the fact; fall back like a denial
    pub fn motion_failed(&mut self) -> InputModality {
        if matches!(
            self.modality,
            InputModality::MotionActive | InputModality::PendingPermission
        ) {
            self.modality = InputModality::TapActive;
            info!("motion unavailable, falling back to tap");
        }
        self.modality
    }

    /// Returns the denial notice once, then `None`
    pub fn take_notice(&mut self) -> Option<&'static str> {
        self.notice.take()
    }

    pub fn prompt(&self) -> &'static str {
        if self.dev_mode {
            return "[dev mode] tap the bottle to wake a story";
        }
        match self.modality {
            InputModality::PendingPermission => "Allow motion access to shake the bottle awake",
            InputModality::MotionActive => "Shake your phone to wake a story",
            InputModality::TapActive | InputModality::Unsupported => {
                "Tap the bottle to wake a story"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_maps_capability_to_modality() {
        assert_eq!(
            InputPolicy::probe(MotionCapability::Unsupported, false).modality(),
            InputModality::Unsupported
        );
        assert_eq!(
            InputPolicy::probe(MotionCapability::PermissionRequired, false).modality(),
            InputModality::PendingPermission
        );
        assert_eq!(
            InputPolicy::probe(MotionCapability::Available, false).modality(),
            InputModality::MotionActive
        );
    }

    #[test]
    fn dev_mode_forces_tap() {
        let policy = InputPolicy::probe(MotionCapability::Available, true);
        assert_eq!(policy.modality(), InputModality::TapActive);
        assert!(policy.tap_enabled());
        assert!(!policy.motion_enabled());
        assert!(policy.prompt().starts_with("[dev mode]"));
    }

    #[test]
    fn pending_disables_both_channels() {
        let policy = InputPolicy::probe(MotionCapability::PermissionRequired, false);
        assert!(!policy.accepts(ActivationSource::Tap));
        assert!(!policy.accepts(ActivationSource::Shake));
    }

    #[test]
    fn grant_enables_motion_only() {
        let mut policy = InputPolicy::probe(MotionCapability::PermissionRequired, false);
        assert_eq!(policy.permission_resolved(true), InputModality::MotionActive);
        assert!(policy.accepts(ActivationSource::Shake));
        assert!(!policy.accepts(ActivationSource::Tap));
        assert_eq!(policy.take_notice(), None);
    }

    #[test]
    fn denial_falls_back_to_tap_with_one_time_notice() {
        let mut policy = InputPolicy::probe(MotionCapability::PermissionRequired, false);
        assert_eq!(policy.permission_resolved(false), InputModality::TapActive);
        assert!(policy.accepts(ActivationSource::Tap));
        assert!(!policy.accepts(ActivationSource::Shake));

        assert_eq!(policy.take_notice(), Some(DENIED_NOTICE));
        assert_eq!(policy.take_notice(), None);
    }

    #[test]
    fn terminal_modalities_ignore_later_grants() {
        let mut denied = InputPolicy::probe(MotionCapability::PermissionRequired, false);
        denied.permission_resolved(false);
        assert_eq!(denied.permission_resolved(true), InputModality::TapActive);

        let mut unsupported = InputPolicy::probe(MotionCapability::Unsupported, false);
        assert_eq!(unsupported.permission_resolved(true), InputModality::Unsupported);
        assert_eq!(unsupported.motion_failed(), InputModality::Unsupported);
    }

    #[test]
    fn prompt_copy_follows_modality() {
        let mut policy = InputPolicy::probe(MotionCapability::PermissionRequired, false);
        assert!(policy.prompt().contains("motion access"));
        policy.permission_resolved(true);
        assert!(policy.prompt().starts_with("Shake"));
        policy.motion_failed();
        assert!(policy.prompt().starts_with("Tap"));
    }

    #[test]
    fn modality_display_names() {
        assert_eq!(InputModality::PendingPermission.to_string(), "pendingPermission");
        assert_eq!(InputModality::TapActive.to_string(), "tapActive");
        assert_eq!(ActivationSource::Shake.to_string(), "shake");
    }
}
