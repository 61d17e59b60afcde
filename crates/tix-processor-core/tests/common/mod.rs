#![allow(dead_code)] // not every test binary uses every helper

use rand::Rng;
use time::OffsetDateTime;

use tix_processor_core::{Observation, PacketType};

/// Box-Muller standard normal draw.
pub fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Fractional Gaussian noise of length `2^levels`, normalized to zero mean
/// and unit variance, via random-midpoint-displacement fractional Brownian
/// motion.
pub fn fractional_gaussian_noise(rng: &mut impl Rng, hurst: f64, levels: u32) -> Vec<f64> {
    let mut points = vec![0.0, standard_normal(rng)];
    let mut displacement = (1.0 - 2f64.powf(2.0 * hurst - 2.0)).sqrt();
    for _ in 0..levels {
        displacement *= 2f64.powf(-hurst);
        let mut refined = Vec::with_capacity(points.len() * 2 - 1);
        for pair in points.windows(2) {
            refined.push(pair[0]);
            refined.push((pair[0] + pair[1]) / 2.0 + displacement * standard_normal(rng));
        }
        refined.push(*points.last().expect("non-empty grid"));
        points = refined;
    }

    let mut increments: Vec<f64> = points.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let n = increments.len() as f64;
    let mean = increments.iter().sum::<f64>() / n;
    let variance = increments
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / n;
    let std = variance.sqrt().max(f64::MIN_POSITIVE);
    for value in &mut increments {
        *value = (*value - mean) / std;
    }
    increments
}

/// Nanoseconds since UTC start of day for a unix-second timestamp.
pub fn nanos_of_day(day_timestamp: i64) -> i64 {
    let datetime = OffsetDateTime::from_unix_timestamp(day_timestamp).expect("valid timestamp");
    let time = datetime.time();
    (i64::from(time.hour()) * 3600 + i64::from(time.minute()) * 60 + i64::from(time.second()))
        * 1_000_000_000
        + i64::from(time.nanosecond())
}

/// Synthetic probe cadence: one short observation per second with a linear
/// server clock drift (ns per second) and per-direction jitter series (ns).
pub fn drifting_observations(
    start: i64,
    drift_ns_per_s: f64,
    upstream_jitter: &[f64],
    downstream_jitter: &[f64],
) -> Vec<Observation> {
    let count = upstream_jitter.len().min(downstream_jitter.len());
    let mut observations = Vec::with_capacity(count);
    for i in 0..count {
        let day_timestamp = start + i as i64;
        let theta = (drift_ns_per_s * i as f64) as i64;
        let upstream = 400_000 + upstream_jitter[i] as i64;
        let downstream = 400_000 + downstream_jitter[i] as i64;
        let processing = 50_000;

        let initial = nanos_of_day(day_timestamp);
        let reception = initial + upstream + theta;
        let sent = reception + processing;
        let final_timestamp = initial + upstream + processing + downstream;

        observations.push(Observation {
            day_timestamp,
            packet_type: PacketType::Short,
            packet_size: 64,
            initial_timestamp: initial,
            reception_timestamp: reception,
            sent_timestamp: sent,
            final_timestamp,
        });
    }
    observations
}
