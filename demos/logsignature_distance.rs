//! Logsignature discrepancy between resampled paths.
//!
//! The logsignature summarizes a path's shape independently of how densely
//! it is sampled, so two discretizations of the same curve land close
//! together while a genuinely different curve stays far away. The demo also
//! compares norm orders, which weight feature components differently.
//!
//! Run with: cargo run --release --example logsignature_distance

use shapelet_rs::{
    logsignature_channels, Depth2Logsignature, Discrepancy, LogsignatureDiscrepancy, PathBatch,
};

fn spiral(n: usize, turns: f64) -> Vec<f64> {
    (0..n)
        .flat_map(|i| {
            let t = i as f64 / (n - 1) as f64;
            let a = t * turns * std::f64::consts::TAU;
            [t * a.cos(), t * a.sin()]
        })
        .collect()
}

fn zigzag(n: usize) -> Vec<f64> {
    (0..n)
        .flat_map(|i| {
            let t = i as f64 / (n - 1) as f64;
            [t, if i % 2 == 0 { 0.2 } else { -0.2 }]
        })
        .collect()
}

fn main() {
    let channels = 2;
    let depth = 2;
    let n = 40;
    let times: Vec<f64> = (0..n).map(|i| i as f64 / (n - 1) as f64).collect();

    println!("Logsignature discrepancy");
    println!("========================");
    println!(
        "Channels: {channels} (+1 time), depth: {depth}, feature dim: {}\n",
        logsignature_channels(channels + 1, depth)
    );

    let disc = LogsignatureDiscrepancy::without_pseudometric(Depth2Logsignature, channels, depth)
        .unwrap();

    // Reference spiral, a coarser resampling of it, and a zigzag
    let reference = PathBatch::single(spiral(n, 1.0), n, channels).unwrap();
    let coarse_data = spiral(n / 2, 1.0);
    // Linear re-interpolation back to n points so the lengths match
    let mut resampled = Vec::with_capacity(n * channels);
    for i in 0..n {
        let x = i as f64 / (n - 1) as f64 * (n / 2 - 1) as f64;
        let k = (x as usize).min(n / 2 - 2);
        let frac = x - k as f64;
        for ch in 0..channels {
            let a = coarse_data[k * channels + ch];
            let b = coarse_data[(k + 1) * channels + ch];
            resampled.push(a + frac * (b - a));
        }
    }
    let coarse = PathBatch::single(resampled, n, channels).unwrap();
    let other = PathBatch::single(zigzag(n), n, channels).unwrap();

    let d_resampled = disc.evaluate(&times, &reference, &coarse).unwrap().item();
    let d_other = disc.evaluate(&times, &reference, &other).unwrap().item();
    println!("spiral vs resampled spiral: {d_resampled:.6}");
    println!("spiral vs zigzag:           {d_other:.6}");
    println!("(shape difference dominates sampling difference)\n");

    // Norm orders weight the feature components differently
    println!("Norm order comparison (spiral vs zigzag):");
    for p in [1.0, 2.0, 4.0, f64::INFINITY] {
        let d = disc
            .clone()
            .with_norm_order(p)
            .unwrap()
            .evaluate(&times, &reference, &other)
            .unwrap()
            .item();
        if p.is_infinite() {
            println!("  p=inf: {d:.6}");
        } else {
            println!("  p={p:<3}: {d:.6}");
        }
    }

    // Broadcast: one reference against a batch of phase-shifted spirals
    let batch: Vec<f64> = (0..5).flat_map(|s| spiral(n, 0.6 + 0.2 * s as f64)).collect();
    let spirals = PathBatch::new(batch, vec![5], n, channels).unwrap();
    let d = disc.evaluate(&times, &reference, &spirals).unwrap();
    println!("\nReference vs 5 spirals of varying twist, shape {:?}:", d.shape);
    for (i, v) in d.data.iter().enumerate() {
        println!("  turns={:.1}: {v:.6}", 0.6 + 0.2 * i as f64);
    }
}
