//! The individual signal sources.

use seen_types::WatchSignal;

use crate::dom::{Inspect, NodeId, style};
use crate::selectors::HostSelectors;

/// Numeric fill of a progress-bar-shaped element.
///
/// For each candidate element, in document order, try the X scale of a 2D
/// transform, then a percentage width, then the rendered width relative to
/// the parent. The first finite number wins.
pub fn progress_bar_ratio(
    doc: &dyn Inspect,
    selectors: &HostSelectors,
    card: NodeId,
) -> Option<WatchSignal> {
    doc.query_all(card, &selectors.progress_bar)
        .into_iter()
        .find_map(|bar| {
            transform_ratio(doc, bar)
                .or_else(|| width_percentage(doc, bar))
                .or_else(|| rendered_fraction(doc, bar))
        })
        .and_then(WatchSignal::ratio)
}

fn transform_ratio(doc: &dyn Inspect, bar: NodeId) -> Option<f64> {
    transform_scale_x(&doc.inline_style(bar, "transform")?)
}

fn width_percentage(doc: &dyn Inspect, bar: NodeId) -> Option<f64> {
    style::percentage(&doc.inline_style(bar, "width")?)
}

fn rendered_fraction(doc: &dyn Inspect, bar: NodeId) -> Option<f64> {
    let width = doc.rendered_width(bar)?;
    let parent = doc.rendered_width(doc.parent(bar)?)?;
    if !parent.is_finite() || parent <= 0.0 {
        return None;
    }
    Some(width / parent).filter(|r| r.is_finite())
}

/// X-axis scale factor of a 2D transform list.
///
/// Accepts `scaleX(x)`, `scale(x)`, `scale(x, y)` and `matrix(a, b, c, d, e, f)`
/// (where `a` is the X scale). 3D forms and `none` yield `None`.
pub fn transform_scale_x(transform: &str) -> Option<f64> {
    transform
        .split_inclusive(')')
        .filter_map(style::function_call)
        .find_map(|(name, args)| match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("scalex", [x]) => style::number(x),
            ("scale", [x]) | ("scale", [x, _]) => style::number(x),
            ("matrix", [a, _, _, _, _, _]) => style::number(a),
            _ => None,
        })
}

/// `(now - min) / (max - min)` of an ARIA progressbar.
///
/// `aria-valuenow` is required; missing bounds default to `0` and `100`.
/// Degenerate ranges (`max <= min`) are discarded.
pub fn aria_ratio(
    doc: &dyn Inspect,
    selectors: &HostSelectors,
    card: NodeId,
) -> Option<WatchSignal> {
    doc.query_all(card, &selectors.aria_progress)
        .into_iter()
        .find_map(|bar| {
            let now = style::number(doc.attribute(bar, "aria-valuenow")?)?;
            let min = bound(doc, bar, "aria-valuemin", 0.0)?;
            let max = bound(doc, bar, "aria-valuemax", 100.0)?;
            if max <= min {
                return None;
            }
            WatchSignal::ratio((now - min) / (max - min))
        })
}

/// A present-but-unparseable bound discards the element, an absent one defaults.
fn bound(doc: &dyn Inspect, bar: NodeId, name: &str, default: f64) -> Option<f64> {
    match doc.attribute(bar, name) {
        Some(raw) => style::number(raw),
        None => Some(default),
    }
}

/// Any progress affordance at all, without a readable fraction.
pub fn presence_marker(
    doc: &dyn Inspect,
    selectors: &HostSelectors,
    card: NodeId,
) -> Option<WatchSignal> {
    let markers = [
        &selectors.resume_overlay,
        &selectors.progress_view,
        &selectors.progress_indicator,
    ];
    markers
        .into_iter()
        .any(|selector| doc.query(card, selector).is_some())
        .then_some(WatchSignal::SeenMarker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, Mutate};
    use crate::selectors::host;

    fn doc_with(inner: &str) -> (Document, NodeId) {
        let doc = Document::parse(&format!(
            "<html><body><ytd-compact-video-renderer>{inner}</ytd-compact-video-renderer></body></html>"
        ))
        .unwrap();
        let card = doc.query(doc.root(), &host().cards).unwrap();
        (doc, card)
    }

    #[test]
    fn test_transform_forms() {
        assert_eq!(transform_scale_x("scaleX(0.42)"), Some(0.42));
        assert_eq!(transform_scale_x("scale(0.3)"), Some(0.3));
        assert_eq!(transform_scale_x("scale(0.3, 1)"), Some(0.3));
        assert_eq!(transform_scale_x("matrix(0.75, 0, 0, 1, 0, 0)"), Some(0.75));
        assert_eq!(transform_scale_x("translateX(4px) scaleX(0.6)"), Some(0.6));
        assert_eq!(transform_scale_x("none"), None);
        assert_eq!(transform_scale_x("scaleX(abc)"), None);
        assert_eq!(transform_scale_x("scale3d(0.5, 1, 1)"), None);
        assert_eq!(transform_scale_x("scaleX(NaN)"), None);
    }

    #[test]
    fn test_transform_scale_is_clamped() {
        for (raw, expected) in [("0", 0.0), ("0.5", 0.5), ("1", 1.0), ("1.6", 1.0), ("-0.4", 0.0)] {
            let (doc, card) = doc_with(&format!(
                r#"<div id="progress" style="transform: scaleX({raw})"/>"#
            ));
            assert_eq!(
                progress_bar_ratio(&doc, host(), card),
                Some(WatchSignal::Ratio(expected)),
                "scaleX({raw})"
            );
        }
    }

    #[test]
    fn test_non_numeric_transform_falls_back_to_width() {
        let (doc, card) = doc_with(
            r#"<div id="progress" style="transform: scaleX(calc(1)); width: 40%"/>"#,
        );
        assert_eq!(progress_bar_ratio(&doc, host(), card), Some(WatchSignal::Ratio(0.4)));
    }

    #[test]
    fn test_rendered_width_fraction() {
        let (doc, card) = doc_with(
            r#"<div style="width: 200px"><div class="ytThumbnailOverlayProgressBarHostWatchedProgressBarSegment" style="width: 150px"/></div>"#,
        );
        assert_eq!(progress_bar_ratio(&doc, host(), card), Some(WatchSignal::Ratio(0.75)));
    }

    #[test]
    fn test_rendered_width_needs_positive_parent() {
        let (mut doc, card) = doc_with(
            r#"<div><div id="progress"/></div>"#,
        );
        let bar = doc.element_by_id("progress").unwrap();
        let parent = doc.parent(bar).unwrap();
        doc.set_layout_width(bar, 30.0).unwrap();
        doc.set_layout_width(parent, 0.0).unwrap();
        assert_eq!(progress_bar_ratio(&doc, host(), card), None);

        doc.set_layout_width(parent, 120.0).unwrap();
        assert_eq!(progress_bar_ratio(&doc, host(), card), Some(WatchSignal::Ratio(0.25)));
    }

    #[test]
    fn test_later_bar_used_when_first_is_empty() {
        let (doc, card) = doc_with(
            r#"<div id="progress"/><div class="ytThumbnailOverlayProgressBarHostWatchedProgressBarSegment" style="width: 20%"/>"#,
        );
        assert_eq!(progress_bar_ratio(&doc, host(), card), Some(WatchSignal::Ratio(0.2)));
    }

    #[test]
    fn test_aria_ratio_cases() {
        let cases = [
            (r#"aria-valuemin="0" aria-valuemax="100" aria-valuenow="30""#, Some(0.3)),
            (r#"aria-valuemin="10" aria-valuemax="20" aria-valuenow="15""#, Some(0.5)),
            (r#"aria-valuemin="0" aria-valuemax="100" aria-valuenow="150""#, Some(1.0)),
            (r#"aria-valuemin="0" aria-valuemax="100" aria-valuenow="-5""#, Some(0.0)),
            (r#"aria-valuenow="80""#, Some(0.8)),
            (r#"aria-valuemin="50" aria-valuemax="10" aria-valuenow="30""#, None),
            (r#"aria-valuemin="0" aria-valuemax="0" aria-valuenow="0""#, None),
            (r#"aria-valuemin="x" aria-valuemax="100" aria-valuenow="30""#, None),
            (r#"aria-valuemin="0" aria-valuemax="100""#, None),
        ];
        for (attrs, expected) in cases {
            let (doc, card) = doc_with(&format!(r#"<div role="progressbar" {attrs}/>"#));
            assert_eq!(
                aria_ratio(&doc, host(), card),
                expected.map(WatchSignal::Ratio),
                "{attrs}"
            );
        }
    }

    #[test]
    fn test_presence_markers() {
        for inner in [
            "<ytd-thumbnail-overlay-resume-playback-renderer/>",
            "<yt-thumbnail-overlay-progress-bar-view-model/>",
            r#"<span id="progress"/>"#,
        ] {
            let (doc, card) = doc_with(inner);
            assert_eq!(presence_marker(&doc, host(), card), Some(WatchSignal::SeenMarker));
        }
        let (doc, card) = doc_with(r#"<div role="progressbar"/>"#);
        assert_eq!(presence_marker(&doc, host(), card), None);
    }

    #[test]
    fn test_sources_only_look_inside_the_card() {
        let doc = Document::parse(
            r#"<html><body>
                 <div id="progress" style="width: 90%"/>
                 <ytd-video-renderer><span>title</span></ytd-video-renderer>
               </body></html>"#,
        )
        .unwrap();
        let card = doc.query(doc.root(), &host().cards).unwrap();
        assert_eq!(progress_bar_ratio(&doc, host(), card), None);
        assert_eq!(presence_marker(&doc, host(), card), None);
    }

    #[test]
    fn test_sources_see_live_updates() {
        let (mut doc, card) = doc_with(r#"<div id="progress" style="width: 10%"/>"#);
        let bar = doc.element_by_id("progress").unwrap();
        assert_eq!(progress_bar_ratio(&doc, host(), card), Some(WatchSignal::Ratio(0.1)));
        doc.set_style_property(bar, "width", Some("95%")).unwrap();
        assert_eq!(progress_bar_ratio(&doc, host(), card), Some(WatchSignal::Ratio(0.95)));
    }
}
