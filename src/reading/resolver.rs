//*** START FILE: src/reading/resolver.rs ***//
use tracing::debug;

use crate::error::{CoachError, CoachResult};
use crate::reading::bubble::{Bubble, BubbleLayout, Rect, Viewport};
use crate::reading::classifier::GranularityThresholds;
use crate::reading::offsets::{SegmentOffsetIndex, SegmentRange};
use crate::services::LookupService;
use crate::types::lookup::{LookupRequest, LookupResult};

/// What the host (browser, terminal, test) knows about the current selection.
/// The resolver never touches a live document.
pub trait SelectionSource {
    fn current_selection_text(&self) -> String;
    fn bounding_rect_of(&self, selection: &str) -> Option<Rect>;
}

/// A selection fixed up front; used by the CLI and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSelection {
    pub text: String,
    pub rect: Option<Rect>,
}

impl SelectionSource for StaticSelection {
    fn current_selection_text(&self) -> String {
        self.text.clone()
    }

    fn bounding_rect_of(&self, _selection: &str) -> Option<Rect> {
        self.rect
    }
}

/// One user selection. `range` is only filled in for segment clicks, where
/// the offsets are already known.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEvent {
    pub text: String,
    pub rect: Option<Rect>,
    pub range: Option<SegmentRange>,
}

impl SelectionEvent {
    pub fn free_text(text: &str, rect: Option<Rect>) -> Self {
        SelectionEvent { text: text.to_string(), rect, range: None }
    }

    pub fn from_source(source: &dyn SelectionSource) -> Self {
        let text = source.current_selection_text();
        let rect = source.bounding_rect_of(&text);
        SelectionEvent { text, rect, range: None }
    }

    /// Click on segment `segment_index`. None when the index is out of range.
    pub fn segment_click(
        index: &SegmentOffsetIndex,
        hanzi: &str,
        segment_index: usize,
        rect: Option<Rect>,
    ) -> Option<Self> {
        let range = index.range_of(segment_index)?;
        Some(SelectionEvent { text: hanzi.to_string(), rect, range: Some(range) })
    }
}

pub type LookupTicket = u64;

/// A lookup that has been issued but not answered yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLookup {
    pub ticket: LookupTicket,
    pub request: LookupRequest,
    pub range: Option<SegmentRange>,
    pub rect: Option<Rect>,
}

/// What to do with a lookup answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Applied {
        bubble: Bubble,
        highlighted: Option<SegmentRange>,
    },
    Failed(CoachError),
    /// A newer lookup was issued after this one; its answer is dropped.
    Superseded { ticket: LookupTicket },
}

/// Turns selections into lookup requests and lookup answers into bubbles.
///
/// Every `begin` stamps its request with a fresh ticket. Only the answer
/// carrying the latest ticket is applied, so an older request that finishes
/// late can't overwrite a newer bubble.
#[derive(Debug, Clone, Default)]
pub struct SelectionResolver {
    thresholds: GranularityThresholds,
    layout: BubbleLayout,
    latest: LookupTicket,
}

impl SelectionResolver {
    pub fn new(thresholds: GranularityThresholds, layout: BubbleLayout) -> Self {
        SelectionResolver { thresholds, layout, latest: 0 }
    }

    pub fn latest_ticket(&self) -> LookupTicket {
        self.latest
    }

    pub fn is_current(&self, ticket: LookupTicket) -> bool {
        ticket == self.latest
    }

    /// Retires every lookup still in flight without issuing a new one. Their
    /// ranges point into text that is no longer shown.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }

    /// Classify and locate the selection. Returns None (and issues no ticket)
    /// for an empty or whitespace-only selection.
    pub fn begin(&mut self, event: &SelectionEvent, index: &SegmentOffsetIndex) -> Option<PendingLookup> {
        let text = event.text.trim();
        if text.is_empty() {
            return None;
        }
        let granularity = self.thresholds.classify(text);
        let range = match event.range {
            Some(range) => Some(range),
            None => index.find_first(text),
        };
        if range.is_none() {
            debug!(text, "selection not found in story text, highlight skipped");
        }
        self.latest += 1;
        Some(PendingLookup {
            ticket: self.latest,
            request: LookupRequest { text: text.to_string(), granularity },
            range,
            rect: event.rect,
        })
    }

    pub fn finish(
        &self,
        pending: PendingLookup,
        outcome: CoachResult<LookupResult>,
        viewport: &Viewport,
    ) -> Resolution {
        if !self.is_current(pending.ticket) {
            debug!(
                ticket = pending.ticket,
                latest = self.latest,
                "discarding superseded lookup"
            );
            return Resolution::Superseded { ticket: pending.ticket };
        }
        match outcome {
            Ok(result) => {
                let (x, y) = self.layout.place(pending.rect, viewport);
                Resolution::Applied {
                    bubble: Bubble { result, x, y },
                    highlighted: pending.range,
                }
            }
            Err(e) => Resolution::Failed(e),
        }
    }

    /// begin + lookup + finish in one go. None for an empty selection.
    pub async fn resolve(
        &mut self,
        event: &SelectionEvent,
        index: &SegmentOffsetIndex,
        lookup: &dyn LookupService,
        token: &str,
        viewport: &Viewport,
    ) -> Option<Resolution> {
        let pending = self.begin(event, index)?;
        let outcome = lookup.lookup(token, &pending.request).await;
        Some(self.finish(pending, outcome, viewport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::local::LocalBackend;
    use crate::types::lookup::Granularity;
    use crate::types::story::{Segment, Story};

    fn index() -> SegmentOffsetIndex {
        let story = Story {
            id: 7,
            title: "公园".to_string(),
            level: None,
            segments: ["我", "在", "公园", "散步", "。", "我", "看到", "猫"]
                .iter()
                .map(|h| Segment::new(h, None))
                .collect(),
        };
        SegmentOffsetIndex::build(&story)
    }

    fn viewport() -> Viewport {
        Viewport { scroll_x: 0.0, scroll_y: 0.0, width: 800.0 }
    }

    fn result(text: &str) -> LookupResult {
        LookupResult {
            text: text.to_string(),
            pinyin: String::new(),
            translation: "t".to_string(),
            granularity: Granularity::Word,
        }
    }

    #[test]
    fn blank_selection_is_ignored() {
        let mut resolver = SelectionResolver::default();
        assert_eq!(resolver.begin(&SelectionEvent::free_text(" \n\t", None), &index()), None);
        assert_eq!(resolver.latest_ticket(), 0);
    }

    #[test]
    fn free_text_resolves_first_occurrence() {
        let mut resolver = SelectionResolver::default();
        let pending = resolver
            .begin(&SelectionEvent::free_text("  我 ", None), &index())
            .unwrap();
        assert_eq!(pending.request.text, "我");
        assert_eq!(pending.request.granularity, Granularity::Character);
        assert_eq!(pending.range, Some(SegmentRange::new(0, 1)));
    }

    #[test]
    fn unknown_text_still_looks_up_without_range() {
        let mut resolver = SelectionResolver::default();
        let pending = resolver
            .begin(&SelectionEvent::free_text("小狗", None), &index())
            .unwrap();
        assert_eq!(pending.range, None);
        match resolver.finish(pending, Ok(result("小狗")), &viewport()) {
            Resolution::Applied { bubble, highlighted } => {
                assert_eq!(bubble.text(), "小狗");
                assert_eq!(highlighted, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn segment_click_keeps_its_own_range() {
        let idx = index();
        let mut resolver = SelectionResolver::default();
        // second "我" is segment 5, not the first occurrence at 0
        let event = SelectionEvent::segment_click(&idx, "我", 5, None).unwrap();
        let pending = resolver.begin(&event, &idx).unwrap();
        assert_eq!(pending.range, Some(SegmentRange::new(7, 8)));
        assert!(SelectionEvent::segment_click(&idx, "x", 99, None).is_none());
    }

    #[test]
    fn missing_rect_places_bubble_at_fallback() {
        let mut resolver = SelectionResolver::default();
        let pending = resolver
            .begin(&SelectionEvent::free_text("公园", None), &index())
            .unwrap();
        match resolver.finish(pending, Ok(result("公园")), &viewport()) {
            Resolution::Applied { bubble, highlighted } => {
                assert_eq!((bubble.x, bubble.y), (100.0, 234.0));
                assert_eq!(highlighted, Some(SegmentRange::new(2, 4)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn late_answer_for_older_request_is_discarded() {
        let idx = index();
        let mut resolver = SelectionResolver::default();
        let first = resolver.begin(&SelectionEvent::free_text("公园", None), &idx).unwrap();
        let second = resolver.begin(&SelectionEvent::free_text("散步", None), &idx).unwrap();

        // newest answer first, then the stale one arrives
        let applied = resolver.finish(second, Ok(result("散步")), &viewport());
        assert!(matches!(applied, Resolution::Applied { .. }));
        let stale = resolver.finish(first, Ok(result("公园")), &viewport());
        assert_eq!(stale, Resolution::Superseded { ticket: 1 });
    }

    #[test]
    fn stale_failure_is_discarded_too() {
        let idx = index();
        let mut resolver = SelectionResolver::default();
        let first = resolver.begin(&SelectionEvent::free_text("公园", None), &idx).unwrap();
        let _second = resolver.begin(&SelectionEvent::free_text("散步", None), &idx).unwrap();
        let stale = resolver.finish(first, Err(CoachError::Lookup("boom".into())), &viewport());
        assert!(matches!(stale, Resolution::Superseded { .. }));
    }

    #[test]
    fn invalidate_retires_pending_lookups() {
        let idx = index();
        let mut resolver = SelectionResolver::default();
        let pending = resolver.begin(&SelectionEvent::free_text("公园", None), &idx).unwrap();
        resolver.invalidate();
        let late = resolver.finish(pending, Ok(result("公园")), &viewport());
        assert_eq!(late, Resolution::Superseded { ticket: 1 });

        // the next selection works as usual
        let fresh = resolver.begin(&SelectionEvent::free_text("散步", None), &idx).unwrap();
        assert!(matches!(resolver.finish(fresh, Ok(result("散步")), &viewport()), Resolution::Applied { .. }));
    }

    #[test]
    fn from_source_reads_text_and_rect() {
        let rect = Rect { left: 1.0, top: 2.0, width: 3.0, height: 4.0 };
        let source = StaticSelection { text: "猫".to_string(), rect: Some(rect) };
        let event = SelectionEvent::from_source(&source);
        assert_eq!(event.text, "猫");
        assert_eq!(event.rect, Some(rect));
        assert_eq!(event.range, None);
    }

    #[tokio::test]
    async fn resolve_runs_the_whole_round_trip() {
        let backend = LocalBackend::new();
        let mut resolver = SelectionResolver::default();
        let resolution = resolver
            .resolve(&SelectionEvent::free_text("公园", None), &index(), &backend, "", &viewport())
            .await
            .unwrap();
        match resolution {
            Resolution::Applied { bubble, highlighted } => {
                assert_eq!(bubble.result.translation, "park");
                assert_eq!(highlighted, Some(SegmentRange::new(2, 4)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
//*** END FILE: src/reading/resolver.rs ***//
