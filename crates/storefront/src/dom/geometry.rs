//! Layout geometry: rectangles, viewports, root margins and intersection ratios.

use crate::result::{StorefrontError, StorefrontResult};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in document coordinates (CSS pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a rectangle
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Area (zero for degenerate rectangles)
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Edge-inclusive overlap with another rectangle
    ///
    /// Touching rectangles produce a zero-area intersection rather than `None`.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right < left || bottom < top {
            return None;
        }
        Some(Self::new(left, top, right - left, bottom - top))
    }
}

/// Visible window onto the document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Vertical scroll offset
    pub scroll_y: f64,
    /// Viewport width
    pub width: f64,
    /// Viewport height
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_y: 0.0,
            width: 390.0,
            height: 844.0,
        }
    }
}

impl Viewport {
    /// Viewport rectangle in document coordinates, grown or shrunk by `margin`
    #[must_use]
    pub fn root_rect(&self, margin: &RootMargin) -> Rect {
        Rect::new(
            -margin.left,
            self.scroll_y - margin.top,
            self.width + margin.left + margin.right,
            self.height + margin.top + margin.bottom,
        )
    }
}

/// Offsets applied to the viewport before intersecting (`rootMargin`)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RootMargin {
    /// Top offset
    pub top: f64,
    /// Right offset
    pub right: f64,
    /// Bottom offset
    pub bottom: f64,
    /// Left offset
    pub left: f64,
}

impl RootMargin {
    /// No margin
    pub const ZERO: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    /// Parse CSS margin shorthand with one to four pixel lengths
    ///
    /// Accepts `"10px"`, `"0 20px"`, `"0px 0px -50px 0px"` and so on. Bare
    /// numbers are treated as pixels.
    pub fn parse(source: &str) -> StorefrontResult<Self> {
        let error = |message: &str| StorefrontError::RootMargin {
            margin: source.to_string(),
            message: message.to_string(),
        };

        let mut values = Vec::with_capacity(4);
        for token in source.split_whitespace() {
            let number = token.strip_suffix("px").unwrap_or(token);
            let value: f64 = number
                .parse()
                .map_err(|_| error(&format!("`{token}` is not a pixel length")))?;
            values.push(value);
        }

        match values.as_slice() {
            [] => Ok(Self::ZERO),
            [all] => Ok(Self::uniform(*all)),
            [vertical, horizontal] => Ok(Self {
                top: *vertical,
                right: *horizontal,
                bottom: *vertical,
                left: *horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self {
                top: *top,
                right: *horizontal,
                bottom: *bottom,
                left: *horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            }),
            _ => Err(error("expected at most four lengths")),
        }
    }

    /// Same offset on every side
    #[must_use]
    pub const fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// Result of intersecting a target with the root rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Intersection {
    /// Visible fraction of the target, in `[0, 1]`
    pub ratio: f64,
    /// Whether the target touches the root at all
    pub intersecting: bool,
}

impl Intersection {
    /// Compute the intersection of `target` with `root`
    ///
    /// Zero-area targets count as fully visible while they touch the root.
    #[must_use]
    pub fn compute(target: &Rect, root: &Rect) -> Self {
        let Some(overlap) = target.intersection(root) else {
            return Self::default();
        };

        let area = target.area();
        let ratio = if area > 0.0 {
            (overlap.area() / area).clamp(0.0, 1.0)
        } else {
            1.0
        };

        Self {
            ratio,
            intersecting: true,
        }
    }

    /// Whether this intersection satisfies `threshold`
    ///
    /// A zero threshold means any contact; otherwise the ratio must reach it.
    #[must_use]
    pub fn meets(&self, threshold: f64) -> bool {
        if threshold <= 0.0 {
            self.intersecting
        } else {
            self.intersecting && self.ratio >= threshold
        }
    }
}
