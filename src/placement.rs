use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position family of an overlay.
///
/// The placement decides two things: how the floating container is aligned inside the
/// viewport-filling background layer when there is no anchor geometry, and which offset
/// formula is used once an anchor has been measured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    #[default]
    #[serde(rename = "Centered")]
    Centered,
    #[serde(rename = "Top left")]
    TopLeft,
    #[serde(rename = "Top center")]
    TopCenter,
    #[serde(rename = "Top right")]
    TopRight,
    #[serde(rename = "Bottom left")]
    BottomLeft,
    #[serde(rename = "Bottom center")]
    BottomCenter,
    #[serde(rename = "Bottom right")]
    BottomRight,
}

/// Flexbox alignment keyword used on the background layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    FlexStart,
    Center,
    FlexEnd,
}

impl Alignment {
    pub fn as_css(self) -> &'static str {
        match self {
            Alignment::FlexStart => "flex-start",
            Alignment::Center => "center",
            Alignment::FlexEnd => "flex-end",
        }
    }
}

/// Cross-axis / main-axis pair applied to the background layer.
///
/// `justify` is `None` when the placement leaves the main axis at its default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerAlignment {
    pub align: Alignment,
    pub justify: Option<Alignment>,
}

/// Which anchor edge the container is placed against on the vertical axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerticalEdge {
    /// Container sits above the anchor.
    Above,
    /// Container sits below the anchor.
    Below,
}

/// Which anchor edge the container is aligned with on the horizontal axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HorizontalEdge {
    Left,
    Right,
}

/// Static configuration record of a placement.
///
/// Every placement maps to exactly one record, so the resolver below never mutates a style
/// conditionally; it only reads this table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementConfig {
    pub alignment: LayerAlignment,
    /// Anchored formula, `None` for the centered variants which have none.
    pub anchored: Option<(VerticalEdge, HorizontalEdge)>,
}

impl Placement {
    pub const ALL: [Placement; 7] = [
        Placement::Centered,
        Placement::TopLeft,
        Placement::TopCenter,
        Placement::TopRight,
        Placement::BottomLeft,
        Placement::BottomCenter,
        Placement::BottomRight,
    ];

    pub const fn config(self) -> PlacementConfig {
        use Alignment::*;
        use HorizontalEdge::{Left, Right};
        use VerticalEdge::{Above, Below};

        let (align, justify, anchored) = match self {
            Placement::Centered => (Center, Some(Center), None),
            Placement::TopLeft => (FlexStart, None, Some((Above, Left))),
            Placement::TopCenter => (Center, None, None),
            Placement::TopRight => (FlexEnd, None, Some((Above, Right))),
            Placement::BottomLeft => (FlexStart, Some(FlexEnd), Some((Below, Left))),
            Placement::BottomCenter => (Center, Some(FlexEnd), None),
            Placement::BottomRight => (FlexEnd, Some(FlexEnd), Some((Below, Right))),
        };

        PlacementConfig {
            alignment: LayerAlignment { align, justify },
            anchored,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Placement::Centered => "Centered",
            Placement::TopLeft => "Top left",
            Placement::TopCenter => "Top center",
            Placement::TopRight => "Top right",
            Placement::BottomLeft => "Bottom left",
            Placement::BottomCenter => "Bottom center",
            Placement::BottomRight => "Bottom right",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Placement {
    type Err = String;

    /// Accepts `"Top left"`, `"top-left"` and `"TopLeft"` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Placement::ALL
            .into_iter()
            .find(|p| {
                p.display_name()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .eq(key.chars())
            })
            .ok_or_else(|| format!("Unknown placement: {}", s))
    }
}

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Live geometry of the anchor and of the overlay's own container, read fresh every time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorGeometry {
    pub anchor: Rect,
    pub container: Rect,
}

/// Caller supplied gaps between anchor and container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Offsets {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Percentage cap applied to the container while it flows by alignment.
pub const FLOW_MAX_PERCENT: u8 = 90;

/// How the floating container is positioned.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionRule {
    /// Positioned by the background layer's flex alignment, capped to a share of the viewport.
    Aligned {
        alignment: LayerAlignment,
        max_width_percent: u8,
        max_height_percent: u8,
    },
    /// Absolutely positioned next to the anchor. Centered variants carry no offsets.
    Absolute { top: Option<f64>, left: Option<f64> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Opacity {
    Hidden,
    Visible,
}

/// Computed style of an overlay.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OverlayPositionStyle {
    pub rule: PositionRule,
    pub opacity: Opacity,
}

impl OverlayPositionStyle {
    /// Style used before the first measurement has landed.
    pub fn hidden(placement: Placement) -> Self {
        OverlayPositionStyle {
            rule: aligned(placement),
            opacity: Opacity::Hidden,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.opacity == Opacity::Visible
    }

    /// CSS declarations for the viewport-filling background layer.
    pub fn layer_css(&self) -> String {
        match self.rule {
            PositionRule::Aligned { alignment, .. } => {
                let mut css = format!("align-items: {};", alignment.align.as_css());
                if let Some(justify) = alignment.justify {
                    css.push_str(&format!(" justify-content: {};", justify.as_css()));
                }
                css
            }
            PositionRule::Absolute { .. } => String::new(),
        }
    }

    /// CSS declarations for the floating container.
    pub fn container_css(&self) -> String {
        let mut decls = Vec::new();
        match self.rule {
            PositionRule::Aligned {
                max_width_percent,
                max_height_percent,
                ..
            } => {
                decls.push(format!("max-width: {}%", max_width_percent));
                decls.push(format!("max-height: {}%", max_height_percent));
            }
            PositionRule::Absolute { top, left } => {
                decls.push("position: absolute".to_string());
                if let Some(top) = top {
                    decls.push(format!("top: {}px", top));
                }
                if let Some(left) = left {
                    decls.push(format!("left: {}px", left));
                }
            }
        }
        let opacity = match self.opacity {
            Opacity::Hidden => 0,
            Opacity::Visible => 1,
        };
        decls.push(format!("opacity: {}", opacity));
        decls.join("; ")
    }
}

fn aligned(placement: Placement) -> PositionRule {
    PositionRule::Aligned {
        alignment: placement.config().alignment,
        max_width_percent: FLOW_MAX_PERCENT,
        max_height_percent: FLOW_MAX_PERCENT,
    }
}

/// Resolve the style of an overlay from its placement and the current geometry.
///
/// Without geometry (no anchor, or an anchor that has not been laid out yet) the container
/// flows by alignment and is capped so it never overflows the viewport. With geometry the
/// container is placed against the anchor:
///
/// * top: `anchor.y - container.height - top` above, `anchor.y + anchor.height + bottom` below
/// * left: `anchor.x + left` for left variants, `anchor.x + anchor.width - container.width - right`
///   for right variants
pub fn resolve(
    placement: Placement,
    geometry: Option<&AnchorGeometry>,
    offsets: &Offsets,
) -> OverlayPositionStyle {
    let rule = match geometry {
        None => aligned(placement),
        Some(geometry) => {
            let (top, left) = match placement.config().anchored {
                Some((vertical, horizontal)) => (
                    Some(anchored_top(vertical, geometry, offsets)),
                    Some(anchored_left(horizontal, geometry, offsets)),
                ),
                None => (None, None),
            };
            PositionRule::Absolute { top, left }
        }
    };

    OverlayPositionStyle {
        rule,
        opacity: Opacity::Visible,
    }
}

fn anchored_top(edge: VerticalEdge, g: &AnchorGeometry, offsets: &Offsets) -> f64 {
    match edge {
        VerticalEdge::Above => g.anchor.y - g.container.height - offsets.top,
        VerticalEdge::Below => g.anchor.y + g.anchor.height + offsets.bottom,
    }
}

fn anchored_left(edge: HorizontalEdge, g: &AnchorGeometry, offsets: &Offsets) -> f64 {
    match edge {
        HorizontalEdge::Left => g.anchor.x + offsets.left,
        HorizontalEdge::Right => g.anchor.x + g.anchor.width - g.container.width - offsets.right,
    }
}
