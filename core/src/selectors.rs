//! Host page selector vocabulary
//!
//! The host's markup is undocumented and drifts. Everything the engine knows
//! about it is concentrated here so a markup change means editing one table.

use std::sync::LazyLock;

use crate::dom::{Compound, Selector};

/// Tag of the home-grid item, the widest wrapper a card can have.
pub const GRID_ITEM_TAG: &str = "ytd-rich-item-renderer";

/// The six card container shapes, in the order they are documented.
pub const CARD_TAGS: [&str; 6] = [
    GRID_ITEM_TAG,                  // Home grid items
    "ytd-rich-grid-media",          // Home card
    "ytd-video-renderer",           // Search
    "ytd-grid-video-renderer",      // Channel grid
    "ytd-compact-video-renderer",   // Sidebar suggestions
    "ytd-playlist-video-renderer",  // Playlists
];

#[derive(Debug, Clone)]
pub struct HostSelectors {
    /// Any of the six card containers.
    pub cards: Selector,

    /// Primary grid-item container; widens the target of hide/dim effects.
    pub grid_item: Selector,

    /// Progress-bar-shaped elements carrying a numeric fill.
    pub progress_bar: Selector,

    /// ARIA progressbars (`role="progressbar"`).
    pub aria_progress: Selector,

    /// "Resume playback" thumbnail overlay.
    pub resume_overlay: Selector,

    /// Progress-bar view-model element of the newer thumbnail markup.
    pub progress_view: Selector,

    /// Bare progress indicator.
    pub progress_indicator: Selector,

    /// Thumbnail region that hosts the dimmed badge.
    pub thumbnail: Selector,

    /// Title text of a card, for reports only.
    pub title: Selector,

    /// Where the toggle pill goes inside the host toolbar.
    pub toolbar: Selector,

    /// Document head, preferred parent of the stylesheet.
    pub head: Selector,
}

impl Default for HostSelectors {
    fn default() -> Self {
        Self {
            cards: Selector::any_of(CARD_TAGS.iter().map(|tag| Compound::tag(tag))),
            grid_item: Compound::tag(GRID_ITEM_TAG).into(),
            progress_bar: Selector::any_of([
                Compound::any().with_id("progress"),
                Compound::any().with_class("ytThumbnailOverlayProgressBarHostWatchedProgressBarSegment"),
            ]),
            aria_progress: Compound::any().with_attr_eq("role", "progressbar").into(),
            resume_overlay: Compound::tag("ytd-thumbnail-overlay-resume-playback-renderer").into(),
            progress_view: Compound::tag("yt-thumbnail-overlay-progress-bar-view-model").into(),
            progress_indicator: Compound::any().with_id("progress").into(),
            thumbnail: Selector::any_of([
                Compound::tag("ytd-thumbnail"),
                Compound::tag("yt-thumbnail-view-model"),
                Compound::tag("a").with_id("thumbnail"),
            ]),
            title: Selector::any_of([
                Compound::any().with_id("video-title"),
                Compound::any().with_id("video-title-link"),
            ]),
            toolbar: Selector::descendant(Compound::tag("ytd-masthead"), Compound::any().with_id("end")),
            head: Compound::tag("head").into(),
        }
    }
}

impl HostSelectors {
    /// Replace the toolbar insertion point.
    pub fn with_toolbar(mut self, toolbar: Selector) -> Self {
        self.toolbar = toolbar;
        self
    }

    /// Recognise additional card containers next to the built-in six.
    pub fn with_extra_cards(mut self, cards: Selector) -> Self {
        self.cards = self.cards.or(cards);
        self
    }
}

/// Shared default vocabulary.
pub fn host() -> &'static HostSelectors {
    static HOST: LazyLock<HostSelectors> = LazyLock::new(HostSelectors::default);
    &HOST
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, Inspect};

    #[test]
    fn test_every_card_shape_is_recognised() {
        let mut markup = String::from("<html><body>");
        for tag in CARD_TAGS {
            markup.push_str(&format!("<{tag}/>"));
        }
        markup.push_str("<ytd-reel-item-renderer/></body></html>");
        let doc = Document::parse(&markup).unwrap();

        let cards = doc.query_all(doc.root(), &host().cards);
        assert_eq!(cards.len(), CARD_TAGS.len());
    }

    #[test]
    fn test_overrides_from_selector_text() {
        let doc = Document::parse(
            r#"<html><body><ytd-masthead><div id="end"/></ytd-masthead><div id="buttons"/><ytd-reel-item-renderer/><ytd-video-renderer/></body></html>"#,
        )
        .unwrap();
        let selectors = HostSelectors::default()
            .with_toolbar("#buttons".parse().unwrap())
            .with_extra_cards("ytd-reel-item-renderer".parse().unwrap());

        let toolbar = doc.query(doc.root(), &selectors.toolbar).unwrap();
        assert_eq!(doc.attribute(toolbar, "id"), Some("buttons"));
        assert_eq!(doc.query_all(doc.root(), &selectors.cards).len(), 2);
    }

    #[test]
    fn test_toolbar_selector_matches_masthead_end() {
        let doc = Document::parse(
            r#"<html><body><ytd-masthead><div id="start"/><div id="end"/></ytd-masthead><div id="end"/></body></html>"#,
        )
        .unwrap();
        let found = doc.query_all(doc.root(), &host().toolbar);
        assert_eq!(found.len(), 1);
    }
}
