/// Capture lifecycle.
///
/// State transitions:
/// ```text
/// stopped → starting → recording → stopped
///              ↓
///           stopped (not ready / provider failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Stopped,
    Starting,
    Recording,
}

impl CaptureState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }
}
