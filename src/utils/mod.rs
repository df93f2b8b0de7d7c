use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Divide when the denominator is positive, otherwise there is no ratio to report.
pub fn safe_div(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator > 0.0 {
        Some(numerator / denominator)
    } else {
        None
    }
}

/// `safe_div` for integer counters.
pub fn ratio(numerator: i32, denominator: i32) -> Option<f64> {
    safe_div(numerator as f64, denominator as f64)
}

/// Share of a team total. Null only when the total is zero; a negative total (air yards
/// can be) still divides.
pub fn share(numerator: i32, denominator: i32) -> Option<f64> {
    (denominator != 0).then(|| numerator as f64 / denominator as f64)
}

/// Bound a value to `[lo, hi]`.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Convert a feed value into a decimal fixed at nine places, so sums of many values stay
/// exact. NaN and infinities count as missing.
pub fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value
        .and_then(Decimal::from_f64)
        .map(|d| d.round_dp(FEED_SCALE))
}

const FEED_SCALE: u32 = 9;

pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Add an optional addend to an optional running sum. The sum stays `None` until
/// something is actually added.
pub fn add_opt(total: Option<Decimal>, addend: Option<Decimal>) -> Option<Decimal> {
    match (total, addend) {
        (Some(t), Some(a)) => Some(t + a),
        (None, a) => a,
        (t, None) => t,
    }
}

/// Kick distance bands used for field goal and PAT buckets.
///
/// Each band is closed at its lower bound, so 20 is in 20-29 and 60 is in 60+.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DistanceBand {
    Under20,
    Twenties,
    Thirties,
    Forties,
    Fifties,
    SixtyPlus,
}

impl DistanceBand {
    pub const ALL: [DistanceBand; 6] = [
        DistanceBand::Under20,
        DistanceBand::Twenties,
        DistanceBand::Thirties,
        DistanceBand::Forties,
        DistanceBand::Fifties,
        DistanceBand::SixtyPlus,
    ];

    pub fn from_distance(yards: i32) -> Self {
        match yards {
            i32::MIN..=19 => DistanceBand::Under20,
            20..=29 => DistanceBand::Twenties,
            30..=39 => DistanceBand::Thirties,
            40..=49 => DistanceBand::Forties,
            50..=59 => DistanceBand::Fifties,
            _ => DistanceBand::SixtyPlus,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Render kick distances as a `;`-separated list in ascending order, `None` when empty.
pub fn distance_list(distances: &[i32]) -> Option<String> {
    if distances.is_empty() {
        return None;
    }
    let mut sorted = distances.to_vec();
    sorted.sort_unstable();
    Some(
        sorted
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(";"),
    )
}
