use super::domain::{IndicatorStatistics, NationalStanding};

const P: f64 = 0.327_591_1;
const A1: f64 = 0.254_829_592;
const A2: f64 = -0.284_496_736;
const A3: f64 = 1.421_413_741;
const A4: f64 = -1.453_152_027;
const A5: f64 = 1.061_405_429;

/// Abramowitz and Stegun 7.1.26, max absolute error about 1.5e-7.
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t) + A3) * t + A2) * t + A1;
    let y = 1.0 - poly * t * (-x * x).exp();

    sign * y
}

/// Normal-approximation percentile of `score`. A non-positive deviation
/// tells nothing about spread, so every score sits at the median.
pub fn percentile(score: f64, mean: f64, standard_deviation: f64) -> u8 {
    if standard_deviation <= 0.0 || !standard_deviation.is_finite() {
        return 50;
    }

    let z = (score - mean) / standard_deviation;
    let cdf = 0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2));
    (100.0 * cdf).round().clamp(0.0, 100.0) as u8
}

pub fn national_standing(score: f64, statistics: &IndicatorStatistics) -> NationalStanding {
    NationalStanding {
        national_mean: statistics.mean,
        standard_deviation: statistics.standard_deviation,
        percentile: percentile(score, statistics.mean, statistics.standard_deviation),
    }
}
