//! Shapelet feature extraction with the pathwise-L2 discrepancy.
//!
//! Slides a small bank of shapelets across windows of a longer series and
//! prints the resulting discrepancy features, then takes one gradient step
//! on the learned pseudometric to pull the best-matching window closer.
//!
//! Run with: cargo run --release --example shapelet_features

use shapelet_rs::{Discrepancy, L2Discrepancy, PathBatch, Tensor};

fn main() {
    let channels = 2;
    let shapelet_len = 20;
    let times: Vec<f64> = (0..shapelet_len).map(|i| i as f64 * 0.1).collect();

    // Series: a sine carrier with a transient bump around index 120
    let series_len = 200;
    let mut series = Vec::with_capacity(series_len * channels);
    for i in 0..series_len {
        let t = i as f64 * 0.1;
        let bump = if (110..130).contains(&i) { 0.8 } else { 0.0 };
        series.push(t.sin() + bump);
        series.push((t * 0.5).cos());
    }

    // Three shapelets: flat, rising ramp, bump
    let mut shapelets = Vec::with_capacity(3 * shapelet_len * channels);
    for _ in 0..shapelet_len {
        shapelets.push(0.0);
        shapelets.push(0.0);
    }
    for i in 0..shapelet_len {
        shapelets.push(i as f64 / shapelet_len as f64);
        shapelets.push(0.0);
    }
    for i in 0..shapelet_len {
        let x = (i as f64 / shapelet_len as f64 - 0.5) * 4.0;
        shapelets.push(0.8 * (-x * x).exp());
        shapelets.push(0.0);
    }
    let shapelet_batch = PathBatch::new(shapelets, vec![3], shapelet_len, channels).unwrap();

    // Non-overlapping windows of the series
    let n_windows = series_len / shapelet_len;
    let windows: Vec<f64> = (0..n_windows)
        .flat_map(|w| {
            series[w * shapelet_len * channels..(w + 1) * shapelet_len * channels]
                .iter()
                .copied()
                .collect::<Vec<_>>()
        })
        .collect();
    let window_batch = PathBatch::new(windows, vec![n_windows], shapelet_len, channels).unwrap();

    let mut disc = L2Discrepancy::new(channels);

    println!("Shapelet features (pathwise-L2 discrepancy)");
    println!("===========================================");
    println!("Shapelets: 3, windows: {n_windows}, length: {shapelet_len}, channels: {channels}\n");

    let features = disc
        .evaluate(&times, &shapelet_batch, &window_batch)
        .unwrap();
    println!("Feature matrix [shapelet, window]:");
    for s in 0..3 {
        print!("  shapelet {s}:");
        for w in 0..n_windows {
            print!(" {:>8.4}", features.data[s * n_windows + w]);
        }
        println!();
    }

    // One gradient step on the pseudometric, minimizing the total discrepancy
    let (_, tape) = disc
        .evaluate_traced(&times, &shapelet_batch, &window_batch)
        .unwrap();
    let grads = disc
        .backward(&tape, &Tensor::ones(vec![3, n_windows]))
        .unwrap();
    let grad_w = grads.linear.unwrap();

    let lr = 0.05;
    disc.linear_mut().unwrap().add_scaled(&grad_w, -lr);

    let after = disc
        .evaluate(&times, &shapelet_batch, &window_batch)
        .unwrap();
    let sum_before: f64 = features.data.iter().sum();
    let sum_after: f64 = after.data.iter().sum();
    println!("\nTotal discrepancy before pseudometric step: {sum_before:.4}");
    println!("Total discrepancy after one step (lr={lr}):  {sum_after:.4}");
}
