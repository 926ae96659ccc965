use crate::error::ViewerError;
use crate::session::{PlatformSupport, SessionState};

pub const LABEL_START: &str = "START AR";
pub const LABEL_STARTING: &str = "STARTING...";
pub const LABEL_STOP: &str = "STOP AR";
pub const LABEL_STOPPING: &str = "STOPPING...";
pub const LABEL_UNSUPPORTED: &str = "AR NOT SUPPORTED";
pub const LABEL_FAILED: &str = "AR FAILED - RETRY";

/// Class toggled on the highlighted thumbnail.
pub const HIGHLIGHT_CLASS: &str = "clicked";

/// What the toggle button should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonView {
    pub label: &'static str,
    pub enabled: bool,
}

impl ButtonView {
    pub fn for_state(
        state: SessionState,
        support: PlatformSupport,
        last_error: Option<&ViewerError>,
    ) -> Self {
        if support == PlatformSupport::Unsupported {
            return Self {
                label: LABEL_UNSUPPORTED,
                enabled: false,
            };
        }
        let (label, enabled) = match state {
            SessionState::Inactive if last_error.is_some() => (LABEL_FAILED, true),
            SessionState::Inactive => (LABEL_START, support == PlatformSupport::Supported),
            SessionState::Starting => (LABEL_STARTING, false),
            SessionState::Active => (LABEL_STOP, true),
            SessionState::Ending => (LABEL_STOPPING, false),
        };
        Self { label, enabled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_platform_disables_button() {
        let view = ButtonView::for_state(SessionState::Inactive, PlatformSupport::Unsupported, None);
        assert_eq!(view.label, LABEL_UNSUPPORTED);
        assert!(!view.enabled);
    }

    #[test]
    fn button_waits_for_support_query() {
        let view = ButtonView::for_state(SessionState::Inactive, PlatformSupport::Unknown, None);
        assert_eq!(view.label, LABEL_START);
        assert!(!view.enabled);
    }

    #[test]
    fn labels_follow_lifecycle() {
        let labels: Vec<&str> = [
            SessionState::Inactive,
            SessionState::Starting,
            SessionState::Active,
            SessionState::Ending,
        ]
        .into_iter()
        .map(|state| ButtonView::for_state(state, PlatformSupport::Supported, None).label)
        .collect();
        assert_eq!(
            labels,
            vec![LABEL_START, LABEL_STARTING, LABEL_STOP, LABEL_STOPPING]
        );
    }

    #[test]
    fn rejected_start_offers_retry() {
        let error = ViewerError::SessionRejected("denied".into());
        let view =
            ButtonView::for_state(SessionState::Inactive, PlatformSupport::Supported, Some(&error));
        assert_eq!(view.label, LABEL_FAILED);
        assert!(view.enabled);
    }
}
