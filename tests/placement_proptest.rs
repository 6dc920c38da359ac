#![cfg(not(target_arch = "wasm32"))]

use proptest::prelude::*;
use tracker::placement::{
    AnchorGeometry, Offsets, Opacity, OverlayPositionStyle, Placement, PositionRule, Rect, resolve,
};

fn coord() -> impl Strategy<Value = f64> {
    (-2000i32..2000).prop_map(f64::from)
}

fn extent() -> impl Strategy<Value = f64> {
    (0i32..1000).prop_map(f64::from)
}

fn rect() -> impl Strategy<Value = Rect> {
    (coord(), coord(), extent(), extent()).prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

fn offsets() -> impl Strategy<Value = Offsets> {
    (extent(), extent(), extent(), extent()).prop_map(|(left, right, top, bottom)| Offsets {
        left,
        right,
        top,
        bottom,
    })
}

fn placement() -> impl Strategy<Value = Placement> {
    prop::sample::select(Placement::ALL.to_vec())
}

proptest! {
    #[test]
    fn anchored_corners_follow_their_formulas(anchor in rect(), container in rect(), offsets in offsets()) {
        let g = AnchorGeometry { anchor, container };
        let above = anchor.y - container.height - offsets.top;
        let below = anchor.y + anchor.height + offsets.bottom;
        let left = anchor.x + offsets.left;
        let right = anchor.x + anchor.width - container.width - offsets.right;

        for (placement, top, x) in [
            (Placement::TopLeft, above, left),
            (Placement::TopRight, above, right),
            (Placement::BottomLeft, below, left),
            (Placement::BottomRight, below, right),
        ] {
            let style = resolve(placement, Some(&g), &offsets);
            prop_assert_eq!(style.rule, PositionRule::Absolute { top: Some(top), left: Some(x) });
            prop_assert_eq!(style.opacity, Opacity::Visible);
        }
    }

    #[test]
    fn centered_variants_never_carry_offsets(anchor in rect(), container in rect(), offsets in offsets()) {
        let g = AnchorGeometry { anchor, container };
        for placement in [Placement::Centered, Placement::TopCenter, Placement::BottomCenter] {
            let style = resolve(placement, Some(&g), &offsets);
            prop_assert_eq!(style.rule, PositionRule::Absolute { top: None, left: None });
        }
    }

    #[test]
    fn missing_geometry_flows_capped(placement in placement(), offsets in offsets()) {
        let style = resolve(placement, None, &offsets);
        let is_capped = matches!(
            style.rule,
            PositionRule::Aligned { max_width_percent: 90, max_height_percent: 90, .. }
        );
        prop_assert!(is_capped);
        prop_assert_eq!(style.rule, OverlayPositionStyle::hidden(placement).rule);
    }

    #[test]
    fn resolving_is_repeatable(placement in placement(), anchor in rect(), container in rect(), offsets in offsets()) {
        let g = AnchorGeometry { anchor, container };
        prop_assert_eq!(resolve(placement, Some(&g), &offsets), resolve(placement, Some(&g), &offsets));
    }
}
