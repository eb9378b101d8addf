//! Property tests for the logsignature discrepancy pipeline.

use shapelet_rs::{
    logsignature_channels, Depth2Logsignature, Discrepancy, DiscrepancyError, LinearMap,
    LogsignatureDiscrepancy, PathBatch, Tensor,
};

fn wavy(n: usize, phase: f64) -> Vec<f64> {
    (0..n).map(|i| (i as f64 * 0.7 + phase).sin()).collect()
}

#[test]
fn identity_on_equal_inputs() {
    let times = [0.0, 0.5, 1.0, 2.0];
    let disc = LogsignatureDiscrepancy::without_pseudometric(Depth2Logsignature, 2, 2).unwrap();
    let p = PathBatch::new(wavy(3 * 4 * 2, 0.8), vec![3], 4, 2).unwrap();
    let d = disc.evaluate(&times, &p, &p.clone()).unwrap();
    for i in 0..3 {
        assert_eq!(d.data[i * 3 + i], 0.0, "self-distance at batch {i}");
    }
}

#[test]
fn broadcast_shape_law() {
    let times = [0.0, 0.5, 1.0];
    let disc = LogsignatureDiscrepancy::without_pseudometric(Depth2Logsignature, 2, 2).unwrap();
    let p1 = PathBatch::new(wavy(3 * 3 * 2, 0.0), vec![3], 3, 2).unwrap();
    let p2 = PathBatch::new(wavy(5 * 7 * 3 * 2, 1.3), vec![5, 7], 3, 2).unwrap();
    let d = disc.evaluate(&times, &p1, &p2).unwrap();
    assert_eq!(d.shape, vec![3, 5, 7]);
}

#[test]
fn channel_count_law() {
    // (channels, depth) -> known Lyndon word counts
    for (c, depth, expected) in [
        (2, 2, 3),
        (3, 2, 6),
        (2, 3, 5),
        (2, 4, 8),
        (1, 5, 1),
        (4, 1, 4),
    ] {
        assert_eq!(
            logsignature_channels(c, depth),
            expected,
            "channels({c}, {depth})"
        );
    }
}

#[test]
fn linear_map_dimension_follows_channel_law() {
    // 3 path channels + time channel = 4 letters at depth 2: 4 + 6 = 10
    let disc = LogsignatureDiscrepancy::new(Depth2Logsignature, 3, 2).unwrap();
    assert_eq!(disc.feature_channels(), 10);
    assert_eq!(disc.linear().unwrap().dim(), 10);
}

#[test]
fn invalid_depth_rejected() {
    let err = LogsignatureDiscrepancy::new(Depth2Logsignature, 2, 0).unwrap_err();
    assert_eq!(err, DiscrepancyError::InvalidDepth { depth: 0 });
}

#[test]
fn channel_mismatch_rejected() {
    let times = [0.0, 1.0, 2.0];
    let disc = LogsignatureDiscrepancy::without_pseudometric(Depth2Logsignature, 2, 2).unwrap();
    let p1 = PathBatch::single(wavy(6, 0.0), 3, 2).unwrap();
    let p2 = PathBatch::single(wavy(9, 0.0), 3, 3).unwrap();
    assert!(matches!(
        disc.evaluate(&times, &p1, &p2),
        Err(DiscrepancyError::ShapeMismatch { .. })
    ));
}

#[test]
fn infinity_norm_bounds_euclidean() {
    let times = [0.0, 0.5, 1.0, 1.5];
    let p1 = PathBatch::single(wavy(8, 0.2), 4, 2).unwrap();
    let p2 = PathBatch::single(wavy(8, 1.6), 4, 2).unwrap();

    let base = LogsignatureDiscrepancy::without_pseudometric(Depth2Logsignature, 2, 2).unwrap();
    let d2 = base.clone().evaluate(&times, &p1, &p2).unwrap().item();
    let dinf = base
        .with_norm_order(f64::INFINITY)
        .unwrap()
        .evaluate(&times, &p1, &p2)
        .unwrap()
        .item();

    // max-abs component never exceeds the Euclidean norm
    assert!(dinf <= d2 + 1e-12, "inf-norm {dinf} > 2-norm {d2}");
    assert!(dinf > 0.0);
}

#[test]
fn one_norm_bounds_euclidean_from_above() {
    let times = [0.0, 0.5, 1.0, 1.5];
    let p1 = PathBatch::single(wavy(8, 0.2), 4, 2).unwrap();
    let p2 = PathBatch::single(wavy(8, 1.6), 4, 2).unwrap();

    let base = LogsignatureDiscrepancy::without_pseudometric(Depth2Logsignature, 2, 2).unwrap();
    let d2 = base.clone().evaluate(&times, &p1, &p2).unwrap().item();
    let d1 = base
        .with_norm_order(1.0)
        .unwrap()
        .evaluate(&times, &p1, &p2)
        .unwrap()
        .item();
    assert!(d1 >= d2 - 1e-12, "1-norm {d1} < 2-norm {d2}");
}

#[test]
fn linear_parameter_gradient_matches_finite_differences() {
    let times = [0.0, 0.7, 1.3];
    let p1 = PathBatch::new(wavy(2 * 3 * 1, 0.4), vec![2], 3, 1).unwrap();
    let p2 = PathBatch::new(wavy(3 * 3 * 1, 1.8), vec![3], 3, 1).unwrap();

    // 1 channel + time at depth 2: feature dim 3
    let f = logsignature_channels(2, 2);
    assert_eq!(f, 3);
    let weight: Vec<f64> = (0..f * f).map(|i| ((i % 5) as f64 - 2.0) * 0.3).collect();

    let build = |w: &[f64]| {
        let mut disc = LogsignatureDiscrepancy::new(Depth2Logsignature, 1, 2).unwrap();
        *disc.linear_mut().unwrap() = LinearMap::from_weight(f, w.to_vec()).unwrap();
        disc
    };

    let disc = build(&weight);
    let (_, tape) = disc.evaluate_traced(&times, &p1, &p2).unwrap();
    let grads = disc.backward(&tape, &Tensor::ones(vec![2, 3])).unwrap();
    let analytic = grads.linear.expect("pseudometric gradient must exist");

    let loss = |w: &[f64]| -> f64 {
        build(w)
            .evaluate(&times, &p1, &p2)
            .unwrap()
            .data
            .iter()
            .sum()
    };

    let eps = 1e-6;
    for idx in 0..f * f {
        let mut plus = weight.clone();
        plus[idx] += eps;
        let mut minus = weight.clone();
        minus[idx] -= eps;
        let fd = (loss(&plus) - loss(&minus)) / (2.0 * eps);
        let an = analytic.weight()[idx];
        assert!(
            (fd - an).abs() < 1e-5,
            "dL/dW[{idx}]: fd={fd}, analytic={an}"
        );
    }
}

#[test]
fn shapelet_transform_shapes_compose() {
    // The caller's shape contract: shapelets [S, L, C] against windows
    // [N, W, L, C] gives features [S, N, W] for the downstream classifier.
    let times = [0.0, 0.5, 1.0];
    let shapelets = PathBatch::new(wavy(4 * 3 * 2, 0.1), vec![4], 3, 2).unwrap();
    let windows = PathBatch::new(wavy(2 * 6 * 3 * 2, 0.9), vec![2, 6], 3, 2).unwrap();

    let disc = LogsignatureDiscrepancy::new(Depth2Logsignature, 2, 2).unwrap();
    let d = disc.evaluate(&times, &shapelets, &windows).unwrap();
    assert_eq!(d.shape, vec![4, 2, 6]);
    assert!(d.data.iter().all(|v| v.is_finite()));
}
