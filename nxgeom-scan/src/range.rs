//! Expansion of a bounded scan into explicit positions.
//!
//! A range is described by `start` and `stop` plus exactly one of a step
//! increment or a number of images:
//!
//! - `Increment`: half-open, `start, start + inc, ...` strictly before `stop`.
//! - `Images`: inclusive of both ends, evenly spaced.
//! - `start == stop` with `Images(n)`: `n` copies of `start` (stills).

use crate::error::{Error, Result};

/// Most points a single range may expand to.
pub const MAX_SCAN_POINTS: u32 = u32::MAX;

/// How the points between `start` and `stop` are chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanStep {
    /// Fixed step between consecutive points.
    Increment(f64),
    /// Total number of points, both ends included.
    Images(usize),
}

/// Rounds `value` to `decimals` decimal places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `num` evenly spaced points from `start` to `stop` inclusive.
///
/// The last point is exactly `stop`; `num == 1` gives `[start]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut points: Vec<f64> = (0..num).map(|i| start + step * i as f64).collect();
            points[num - 1] = stop;
            points
        }
    }
}

/// Expands a bounded scan.
///
/// # Errors
/// Returns [`Error::Configuration`] for non-finite bounds, a zero or
/// non-finite increment, an increment pointing away from `stop`, zero
/// images, `start == stop` described by an increment, or an increment too
/// small to cover the range in [`MAX_SCAN_POINTS`] points.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
pub fn scan_range(start: f64, stop: f64, step: ScanStep) -> Result<Vec<f64>> {
    if !start.is_finite() || !stop.is_finite() {
        return Err(Error::Configuration(format!(
            "scan bounds must be finite, got {start} to {stop}"
        )));
    }
    match step {
        ScanStep::Images(0) => Err(Error::Configuration(
            "number of images must be at least 1".into(),
        )),
        ScanStep::Images(n) if start == stop => Ok(vec![start; n]),
        ScanStep::Images(n) => Ok(linspace(start, stop, n)),
        ScanStep::Increment(inc) => {
            if !inc.is_normal() {
                return Err(Error::Configuration(format!(
                    "scan increment must be a non-zero finite value, got {inc}"
                )));
            }
            let span = stop - start;
            if span == 0.0 {
                return Err(Error::Configuration(format!(
                    "start and stop are both {start}: a still collection needs a number of images"
                )));
            }
            if span.signum() != inc.signum() {
                return Err(Error::Configuration(format!(
                    "increment {inc} does not move from {start} towards {stop}"
                )));
            }
            // Absorb floating error in the quotient before taking the ceiling.
            let len = round_to(span / inc, 1).ceil();
            if !len.is_finite() || len > f64::from(MAX_SCAN_POINTS) {
                return Err(Error::Configuration(format!(
                    "increment {inc} from {start} to {stop} gives more than {MAX_SCAN_POINTS} points"
                )));
            }
            let len = len as usize;
            Ok((0..len).map(|i| start + inc * i as f64).collect())
        }
    }
}

/// Expands a bounded scan from optional parameters, as read from
/// configuration.
///
/// # Errors
/// Returns [`Error::Configuration`] if both or neither of `increment` and
/// `num_images` are given, plus everything [`scan_range`] rejects.
pub fn scan_range_from(
    start: f64,
    stop: f64,
    increment: Option<f64>,
    num_images: Option<usize>,
) -> Result<Vec<f64>> {
    let step = match (increment, num_images) {
        (Some(inc), None) => ScanStep::Increment(inc),
        (None, Some(n)) => ScanStep::Images(n),
        (Some(_), Some(_)) => {
            return Err(Error::Configuration(
                "increment and number of images are mutually exclusive, pass only one".into(),
            ))
        }
        (None, None) => {
            return Err(Error::Configuration(
                "pass either an increment or a number of images to calculate the scan".into(),
            ))
        }
    };
    scan_range(start, stop, step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn min_max(values: &[f64]) -> (f64, f64) {
        values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    #[test]
    fn test_scan_range_with_increment() {
        let r = scan_range(0.0, 10.0, ScanStep::Increment(0.25)).unwrap();
        assert_eq!(r.len(), 40);
        let (lo, hi) = min_max(&r);
        assert_relative_eq!(lo, 0.0);
        assert_relative_eq!(hi, 9.75);
        assert_relative_eq!(r[3], 0.75);
    }

    #[test]
    fn test_scan_range_with_num_images() {
        let r = scan_range(0.0, 10.0, ScanStep::Images(41)).unwrap();
        assert_eq!(r.len(), 41);
        let (lo, hi) = min_max(&r);
        assert_relative_eq!(lo, 0.0);
        assert_relative_eq!(hi, 10.0);
        assert_relative_eq!(r[3], 0.75);
    }

    #[test]
    fn test_scan_range_for_stills() {
        let r = scan_range(2.0, 2.0, ScanStep::Images(41)).unwrap();
        assert_eq!(r, vec![2.0; 41]);
    }

    #[test]
    fn test_scan_range_absorbs_floating_error() {
        let r = scan_range(0.0, 1.0, ScanStep::Increment(0.1)).unwrap();
        assert_eq!(r.len(), 10);
        assert_relative_eq!(r[9], 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_reverse_scan_range() {
        let r = scan_range(0.0, -2.0, ScanStep::Increment(-0.5)).unwrap();
        assert_eq!(r, vec![0.0, -0.5, -1.0, -1.5]);
        assert!(matches!(
            scan_range(0.0, -2.0, ScanStep::Increment(0.5)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_single_image_returns_start() {
        assert_eq!(scan_range(5.0, 10.0, ScanStep::Images(1)).unwrap(), vec![5.0]);
    }

    #[test]
    fn test_scan_range_from_rejects_bad_combinations() {
        assert!(matches!(
            scan_range_from(0.0, 10.0, Some(0.1), Some(100)),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            scan_range_from(0.0, 10.0, None, None),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            scan_range_from(2.0, 2.0, Some(0.1), None),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            scan_range_from(0.0, 1.0, None, Some(0)),
            Err(Error::Configuration(_))
        ));
        assert_eq!(scan_range_from(0.0, 1.0, None, Some(3)).unwrap(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_scan_range_rejects_unbounded_expansion() {
        assert!(matches!(
            scan_range(0.0, 1e30, ScanStep::Increment(1e-10)),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            scan_range(0.0, f64::INFINITY, ScanStep::Increment(1.0)),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            scan_range(f64::NAN, 1.0, ScanStep::Images(3)),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            scan_range(-f64::MAX, f64::MAX, ScanStep::Increment(f64::MIN_POSITIVE)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_round_to() {
        assert_relative_eq!(round_to(2.374_999_999_9, 3), 2.375);
        assert_relative_eq!(round_to(-0.849, 1), -0.8);
    }
}
