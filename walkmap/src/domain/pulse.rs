//! Pulsing indicator for the current search centre.
//!
//! The animation is a pure function of wall-clock time: a 2 s grow phase
//! followed by a 1 s pause. Each frame is rasterised into a reusable RGBA
//! buffer that the render loop uploads as a style image.

use std::time::Duration;

use chrono::{DateTime, Utc};
use image::{Rgba, RgbaImage};

/// Edge length of the indicator image in pixels.
pub const PULSE_SIZE_PX: u32 = 200;

const GROW: Duration = Duration::from_millis(2_000);
const PAUSE: Duration = Duration::from_millis(1_000);
const STROKE_WIDTH_PX: f64 = 6.0;
const ROYAL_BLUE: [u8; 3] = [65, 105, 225];

/// Geometry of one animation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseFrame {
    /// Progress through the grow phase in `[0, 1]`.
    pub progress: f64,
    /// Radius of the solid core in pixels.
    pub inner_radius: f64,
    /// Radius of the expanding ring in pixels.
    pub outer_radius: f64,
    /// Opacity of the outer ring in `[0, 1]`.
    pub outer_alpha: f64,
}

/// Full animation period.
#[must_use]
pub const fn pulse_period() -> Duration {
    GROW.saturating_add(PAUSE)
}

/// Compute the frame for an arbitrary elapsed time; the period wraps.
///
/// ```
/// use std::time::Duration;
/// use walkmap::domain::pulse_frame;
///
/// let start = pulse_frame(Duration::ZERO, 200);
/// assert_eq!(start.outer_radius, start.inner_radius);
/// let paused = pulse_frame(Duration::from_millis(2_500), 200);
/// assert_eq!(paused.outer_alpha, 0.0);
/// ```
#[expect(
    clippy::float_arithmetic,
    reason = "frame geometry is computed in floating point pixels"
)]
#[must_use]
pub fn pulse_frame(elapsed: Duration, size_px: u32) -> PulseFrame {
    let phase_ms = elapsed
        .as_millis()
        .checked_rem(pulse_period().as_millis())
        .unwrap_or_default();
    let grow_ms = GROW.as_millis();
    let progress = if phase_ms < grow_ms {
        // The phase is below the grow window, which fits in u32.
        let phase = u32::try_from(phase_ms).map_or(f64::MAX, f64::from);
        let grow = u32::try_from(grow_ms).map_or(f64::MAX, f64::from);
        (phase / grow).min(1.0)
    } else {
        1.0
    };

    let half = f64::from(size_px) / 2.0;
    let inner_radius = half * 0.2;
    PulseFrame {
        progress,
        inner_radius,
        outer_radius: half * 0.7 * progress + inner_radius,
        outer_alpha: 1.0 - progress,
    }
}

/// Animated centre icon backed by one pixel buffer.
#[derive(Debug, Clone)]
pub struct PulsingDot {
    pixels: RgbaImage,
}

impl Default for PulsingDot {
    fn default() -> Self {
        Self::new(PULSE_SIZE_PX)
    }
}

impl PulsingDot {
    /// Transparent square buffer of `size_px` pixels per side.
    #[must_use]
    pub fn new(size_px: u32) -> Self {
        Self {
            pixels: RgbaImage::new(size_px, size_px),
        }
    }

    /// Most recently rendered frame.
    #[must_use]
    pub const fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Rasterise the frame for wall-clock time `now`.
    pub fn render_at(&mut self, now: DateTime<Utc>) -> &RgbaImage {
        let period_ms = i64::try_from(pulse_period().as_millis()).unwrap_or(i64::MAX);
        let phase_ms = u64::try_from(now.timestamp_millis().rem_euclid(period_ms)).unwrap_or(0);
        self.render(Duration::from_millis(phase_ms))
    }

    /// Rasterise the frame `elapsed` into the animation.
    #[expect(
        clippy::float_arithmetic,
        reason = "distance tests run on floating point pixel centres"
    )]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "ring alpha is rounded and clamped to 0..=255 before the cast"
    )]
    pub fn render(&mut self, elapsed: Duration) -> &RgbaImage {
        let frame = pulse_frame(elapsed, self.pixels.width());
        let centre = f64::from(self.pixels.width()) / 2.0;
        let half_stroke = STROKE_WIDTH_PX / 2.0;
        let [r, g, b] = ROYAL_BLUE;
        let ring_alpha = (frame.outer_alpha * 255.0).round().clamp(0.0, 255.0) as u8;

        for (x, y, pixel) in self.pixels.enumerate_pixels_mut() {
            let dx = f64::from(x) + 0.5 - centre;
            let dy = f64::from(y) + 0.5 - centre;
            let distance = dx.hypot(dy);

            *pixel = if (distance - frame.inner_radius).abs() <= half_stroke {
                Rgba([255, 255, 255, 255])
            } else if distance < frame.inner_radius {
                Rgba([r, g, b, 255])
            } else if distance <= frame.outer_radius && ring_alpha > 0 {
                Rgba([r, g, b, ring_alpha])
            } else {
                Rgba([0, 0, 0, 0])
            };
        }
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::start(0, 0.0)]
    #[case::mid_grow(1_000, 0.5)]
    #[case::pause(2_500, 1.0)]
    #[case::wrapped(4_000, 0.5)]
    fn progress_follows_grow_then_pause(#[case] millis: u64, #[case] expected: f64) {
        let frame = pulse_frame(Duration::from_millis(millis), PULSE_SIZE_PX);
        assert!((frame.progress - expected).abs() < 1e-9);
        assert!((frame.outer_alpha - (1.0 - expected)).abs() < 1e-9);
    }

    #[test]
    fn mid_grow_frame_has_expected_radii() {
        let frame = pulse_frame(Duration::from_millis(1_000), PULSE_SIZE_PX);
        assert!((frame.inner_radius - 20.0).abs() < 1e-9);
        assert!((frame.outer_radius - 55.0).abs() < 1e-9);
    }

    #[test]
    fn raster_layers_core_stroke_and_ring() {
        let mut dot = PulsingDot::default();
        let image = dot.render(Duration::from_millis(1_000));

        assert_eq!(image.get_pixel(100, 100), &Rgba([65, 105, 225, 255]));
        // Stroke straddles the inner radius (20 px from centre).
        assert_eq!(image.get_pixel(120, 100), &Rgba([255, 255, 255, 255]));
        assert_eq!(image.get_pixel(140, 100), &Rgba([65, 105, 225, 128]));
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn paused_frame_hides_outer_ring() {
        let mut dot = PulsingDot::default();
        let image = dot.render(Duration::from_millis(2_500));
        assert_eq!(image.get_pixel(140, 100), &Rgba([0, 0, 0, 0]));
    }
}
