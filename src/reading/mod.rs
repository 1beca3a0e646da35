//*** START FILE: src/reading/mod.rs ***//
pub mod bubble;
pub mod classifier;
pub mod highlight;
pub mod offsets;
pub mod resolver;
pub mod state;

// Re-export what the app and the CLI reach for
pub use bubble::{Bubble, BubbleLayout, Rect, Viewport};
pub use classifier::{classify, GranularityThresholds};
pub use highlight::{highlighted_segments, is_highlighted};
pub use offsets::{SegmentOffsetIndex, SegmentRange};
pub use resolver::{PendingLookup, Resolution, SelectionEvent, SelectionResolver, SelectionSource, StaticSelection};
pub use state::{ReadingEvent, ReadingState};
//*** END FILE: src/reading/mod.rs ***//
