//! Post-processing applied to the model's base path.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

/// Walk step deviation, as a multiple of historical volatility
pub const WALK_SCALE: f64 = 0.4;
pub const WEEKLY_AMPLITUDE: f64 = 0.3;
pub const MONTHLY_AMPLITUDE: f64 = 0.2;
/// Allowed band around the last observed price
pub const LOWER_BOUND: f64 = 0.7;
pub const UPPER_BOUND: f64 = 1.3;
/// Largest day-over-day move, as a fraction of the last observed price
pub const MAX_DAILY_MOVE: f64 = 0.05;

/// Add a volatility-scaled random walk, a weekly and monthly wave, and the recent trend.
///
/// `adjusted[i] = base[i] * (1 + walk[i]) + seasonal[i] + trend * i`
pub fn synthesize<R: Rng + ?Sized>(base: &[f64], volatility: f64, trend: f64, rng: &mut R) -> Vec<f64> {
    let volatility = if volatility.is_finite() { volatility.abs() } else { 0.0 };
    let trend = if trend.is_finite() { trend } else { 0.0 };

    let steps: Vec<f64> = match Normal::new(0.0, WALK_SCALE * volatility) {
        Ok(normal) => (0..base.len()).map(|_| normal.sample(rng)).collect(),
        Err(_) => vec![0.0; base.len()],
    };

    let mut walk = 0.0;
    base.iter()
        .zip(steps)
        .enumerate()
        .map(|(i, (value, step))| {
            walk += step;
            let day = i as f64;
            let seasonal = WEEKLY_AMPLITUDE * volatility * (2.0 * PI * day / 7.0).sin()
                + MONTHLY_AMPLITUDE * volatility * (2.0 * PI * day / 30.0).sin();
            value * (1.0 + walk) + seasonal + trend * day
        })
        .collect()
}

pub fn clamp_to_band(path: &mut [f64], last_price: f64) {
    let (lo, hi) = (LOWER_BOUND * last_price, UPPER_BOUND * last_price);
    for value in path.iter_mut() {
        *value = value.clamp(lo, hi);
    }
}

/// Left to right, pull each day to within `MAX_DAILY_MOVE * last_price` of the day before.
/// The first day is not compared against the last observation.
pub fn cap_daily_moves(path: &mut [f64], last_price: f64) {
    let cap = MAX_DAILY_MOVE * last_price;
    for i in 1..path.len() {
        let prev = path[i - 1];
        let change = path[i] - prev;
        if change > cap {
            path[i] = prev + cap;
        } else if change < -cap {
            path[i] = prev - cap;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_volatility_leaves_base_plus_trend() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = synthesize(&[100.0, 100.0, 100.0], 0.0, 2.0, &mut rng);
        assert_eq!(out, vec![100.0, 102.0, 104.0]);
    }

    #[test]
    fn test_synthesize_is_seed_deterministic() {
        let base = vec![500.0; 20];
        let a = synthesize(&base, 0.05, 1.0, &mut StdRng::seed_from_u64(9));
        let b = synthesize(&base, 0.05, 1.0, &mut StdRng::seed_from_u64(9));
        let c = synthesize(&base, 0.05, 1.0, &mut StdRng::seed_from_u64(10));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_clamp_to_band() {
        let mut path = vec![50.0, 100.0, 200.0];
        clamp_to_band(&mut path, 100.0);
        assert_eq!(path, vec![70.0, 100.0, 130.0]);
    }

    #[test]
    fn test_cap_daily_moves() {
        let mut path = vec![100.0, 120.0, 121.0, 90.0];
        cap_daily_moves(&mut path, 100.0);
        assert_eq!(path, vec![100.0, 105.0, 106.0, 101.0]);
    }
}
