/// Recording state machine driven by the record control.
///
/// State transitions:
/// ```text
/// stopped → recording → draining → stopped
///               ↑           │
///               └───────────┘ (re-enabled before the final flush lands)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordState {
    #[default]
    Stopped,
    Recording,
    Draining,
}

impl RecordState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_draining(&self) -> bool {
        matches!(self, Self::Draining)
    }
}

/// Background writer state, as last published by the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WriterState {
    Idle = 0,
    Woken = 1,
    Flushing = 2,
    Stopped = 3,
}

impl WriterState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Woken,
            2 => Self::Flushing,
            _ => Self::Stopped,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}
