//! Pure conversions from raw achievement values to scores.

use std::cmp::Ordering;

use super::domain::ScoreError;

/// Position of `value` within `[min, max]` as a fraction in `[0, 1]`.
///
/// Values outside the scale saturate to the nearest bound, the same way the
/// gradebook treats out-of-range grades. The scale must have positive width.
pub fn percentage_achieved(value: f64, max: f64, min: f64) -> Result<f64, ScoreError> {
    // Also rejects NaN bounds.
    if max.partial_cmp(&min) != Some(Ordering::Greater) {
        return Err(ScoreError::DivisionByZero { min, max });
    }

    let clamped = if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    };

    Ok((clamped - min) / (max - min))
}

/// All-or-nothing score: the full `max_score` only for exactly 100 %.
pub fn score(max_score: f64, percentage_achieved: f64) -> f64 {
    if percentage_achieved == 1.0 {
        max_score
    } else {
        0.0
    }
}

/// Proportional score used for graded elements.
pub fn linear_score(max_score: f64, percentage_achieved: f64) -> f64 {
    max_score * percentage_achieved
}
