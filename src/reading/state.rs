use crate::reading::bubble::Bubble;
use crate::reading::offsets::SegmentRange;
use crate::reading::resolver::Resolution;

/// What the reader currently shows: at most one bubble, the range tied to
/// it, and the latest error message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingState {
    pub bubble: Option<Bubble>,
    pub highlighted: Option<SegmentRange>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadingEvent {
    Resolved(Resolution),
    /// Any other failure; replaces the visible message and nothing else.
    Error(String),
    ClearError,
    Dismiss,
    StoryChanged,
}

impl ReadingState {
    pub fn apply(self, event: ReadingEvent) -> Self {
        match event {
            ReadingEvent::Resolved(Resolution::Applied { bubble, highlighted }) => ReadingState {
                bubble: Some(bubble),
                highlighted,
                ..self
            },
            // bubble and highlight survive a failed lookup
            ReadingEvent::Resolved(Resolution::Failed(e)) => ReadingState {
                error: Some(e.to_string()),
                ..self
            },
            ReadingEvent::Resolved(Resolution::Superseded { .. }) => self,
            ReadingEvent::Error(message) => ReadingState { error: Some(message), ..self },
            ReadingEvent::ClearError => ReadingState { error: None, ..self },
            ReadingEvent::Dismiss | ReadingEvent::StoryChanged => ReadingState {
                bubble: None,
                highlighted: None,
                ..self
            },
        }
    }
}
