//*** START FILE: src/reading/bubble.rs ***//
use serde::{Deserialize, Serialize};

use crate::types::lookup::LookupResult;

/// Viewport-relative rectangle of a selection, as the host reports it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Scroll position plus visible width of the page.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub width: f64,
}

/// Fixed placement constants. The fallback values stand in for a missing
/// rectangle (programmatic selections have none).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct BubbleLayout {
    pub edge_margin: f64,
    pub vertical_offset: f64,
    pub fallback_left: f64,
    pub fallback_width: f64,
    pub fallback_bottom: f64,
}

impl Default for BubbleLayout {
    fn default() -> Self {
        BubbleLayout {
            edge_margin: 40.0,
            vertical_offset: 14.0,
            fallback_left: 100.0,
            fallback_width: 0.0,
            fallback_bottom: 220.0,
        }
    }
}

impl BubbleLayout {
    /// Absolute page coordinates for a bubble anchored under `rect`.
    /// x is kept `edge_margin` away from both viewport edges, y is never clamped.
    pub fn place(&self, rect: Option<Rect>, viewport: &Viewport) -> (f64, f64) {
        let (left, width, bottom) = match rect {
            Some(r) => (r.left, r.width, r.bottom()),
            None => (self.fallback_left, self.fallback_width, self.fallback_bottom),
        };
        let anchor_x = viewport.scroll_x + left + width / 2.0;
        let min_x = viewport.scroll_x + self.edge_margin;
        let max_x = viewport.scroll_x + viewport.width - self.edge_margin;
        // max before min: a viewport narrower than both margins pins to max_x
        // instead of panicking like f64::clamp would.
        let x = anchor_x.max(min_x).min(max_x);
        let y = viewport.scroll_y + bottom + self.vertical_offset;
        (x, y)
    }
}

/// Place with the stock layout.
pub fn place(rect: Option<Rect>, viewport: &Viewport) -> (f64, f64) {
    BubbleLayout::default().place(rect, viewport)
}

/// The single live annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub result: LookupResult,
    pub x: f64,
    pub y: f64,
}

impl Bubble {
    pub fn text(&self) -> &str {
        &self.result.text
    }
}

//*** END FILE: src/reading/bubble.rs ***//
