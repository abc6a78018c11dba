use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{Result, StabilityError};

/// Movement beyond this many pixels on either axis counts as a layout shift.
/// The comparison is strict: a move of exactly 5px is still in tolerance.
pub const SHIFT_TOLERANCE_PX: f64 = 5.0;

/// On-screen rectangle in pixel units. Negative `top`/`left` are legal
/// (off-viewport regions); dimensions are not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("top", self.top),
            ("left", self.left),
            ("width", self.width),
            ("height", self.height),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(StabilityError::Validation(format!(
                    "rect {field} must be finite, got {value}"
                )));
            }
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(StabilityError::Validation(format!(
                "rect dimensions must be non-negative, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Euclidean distance between the top-left corners of two rectangles.
    pub fn corner_distance(&self, other: &Rect) -> f64 {
        let dt = self.top - other.top;
        let dl = self.left - other.left;
        (dt * dt + dl * dl).sqrt()
    }
}

/// Position history for one observed UI region.
///
/// `original` is a one-time baseline, not a rolling previous value: the
/// tracker detects drift away from first-paint position, not frame-to-frame
/// jitter. The shift flag is a pure function of the two rectangles, so a
/// region that returns within tolerance un-flags itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRecord {
    pub element_id: String,
    /// First-ever recorded rectangle; immutable afterwards.
    pub original: Rect,
    pub current: Rect,
    pub has_shift: bool,
    /// Corner distance from the baseline, 0.0 while within tolerance.
    pub shift_amount: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl LayoutRecord {
    pub fn new(element_id: impl Into<String>, rect: Rect, now: DateTime<Utc>) -> Self {
        Self {
            element_id: element_id.into(),
            original: rect,
            current: rect,
            has_shift: false,
            shift_amount: 0.0,
            first_seen: now,
            last_seen: now,
        }
    }

    /// Record a new measurement and return whether this observation moved
    /// the region from in-tolerance to shifted.
    pub fn observe(&mut self, rect: Rect, now: DateTime<Utc>) -> bool {
        let was_shifted = self.has_shift;
        self.current = rect;
        self.has_shift = exceeds_tolerance(&self.original, &rect);
        self.shift_amount = if self.has_shift {
            rect.corner_distance(&self.original)
        } else {
            0.0
        };
        self.last_seen = now;
        self.has_shift && !was_shifted
    }
}

fn exceeds_tolerance(original: &Rect, current: &Rect) -> bool {
    (current.top - original.top).abs() > SHIFT_TOLERANCE_PX
        || (current.left - original.left).abs() > SHIFT_TOLERANCE_PX
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_baseline_is_immutable() {
        let now = Utc::now();
        let mut record = LayoutRecord::new("banner", Rect::new(0.0, 0.0, 800.0, 60.0), now);
        assert!(record.observe(Rect::new(10.0, 0.0, 800.0, 60.0), now));

        assert_relative_eq!(record.original.top, 0.0);
        assert_relative_eq!(record.current.top, 10.0);
        assert!(record.has_shift);
        assert_relative_eq!(record.shift_amount, 10.0);
    }

    #[test]
    fn test_tolerance_is_strict() {
        let now = Utc::now();
        let mut record = LayoutRecord::new("card", Rect::new(100.0, 50.0, 300.0, 200.0), now);

        assert!(!record.observe(Rect::new(105.0, 50.0, 300.0, 200.0), now));
        assert!(!record.has_shift);
        assert_relative_eq!(record.shift_amount, 0.0);

        assert!(record.observe(Rect::new(105.01, 50.0, 300.0, 200.0), now));
        assert!(record.has_shift);
        assert_relative_eq!(record.shift_amount, 5.01);
    }

    #[test]
    fn test_shift_amount_is_corner_distance() {
        let now = Utc::now();
        let mut record = LayoutRecord::new("panel", Rect::new(0.0, 0.0, 100.0, 100.0), now);
        record.observe(Rect::new(3.0, 6.0, 100.0, 100.0), now);

        // Left axis alone exceeds tolerance; distance covers both axes.
        assert!(record.has_shift);
        assert_relative_eq!(record.shift_amount, (9.0f64 + 36.0).sqrt());
    }

    #[test]
    fn test_returning_within_tolerance_unflags() {
        let now = Utc::now();
        let mut record = LayoutRecord::new("toast", Rect::new(20.0, 20.0, 200.0, 40.0), now);
        assert!(record.observe(Rect::new(40.0, 20.0, 200.0, 40.0), now));
        assert!(!record.observe(Rect::new(22.0, 20.0, 200.0, 40.0), now));

        assert!(!record.has_shift);
        assert_relative_eq!(record.shift_amount, 0.0);

        // Drifting out again is a fresh transition.
        assert!(record.observe(Rect::new(40.0, 20.0, 200.0, 40.0), now));
    }

    #[test]
    fn test_rect_validation() {
        assert!(Rect::new(0.0, 0.0, 10.0, 10.0).validate().is_ok());
        assert!(Rect::new(-50.0, -10.0, 10.0, 10.0).validate().is_ok());
        assert!(Rect::new(f64::NAN, 0.0, 10.0, 10.0).validate().is_err());
        assert!(Rect::new(0.0, f64::INFINITY, 10.0, 10.0).validate().is_err());
        assert!(Rect::new(0.0, 0.0, -1.0, 10.0).validate().is_err());
    }
}
