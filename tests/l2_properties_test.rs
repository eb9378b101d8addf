//! Property tests for the pathwise-L2 discrepancy kernel.

use shapelet_rs::{
    l2_discrepancy, l2_discrepancy_backward, Discrepancy, DiscrepancyError, L2Discrepancy,
    LinearMap, PathBatch, Tensor,
};

const EPSILON: f64 = 1e-10;

/// Deterministic pseudo-random fill, keeps the tests reproducible without a
/// seeded RNG dependency.
fn wavy(n: usize, phase: f64) -> Vec<f64> {
    (0..n).map(|i| (i as f64 * 0.7 + phase).sin()).collect()
}

#[test]
fn identity_on_equal_inputs() {
    let times = [0.0, 0.4, 1.1, 2.0];
    let p = PathBatch::new(wavy(2 * 4 * 3, 0.3), vec![2], 4, 3).unwrap();
    let d = l2_discrepancy(&times, &p, &p.clone(), None).unwrap();
    // Self-comparison along the diagonal of the 2x2 result
    assert_eq!(d.shape, vec![2, 2]);
    assert_eq!(d.data[0], 0.0);
    assert_eq!(d.data[3], 0.0);
}

#[test]
fn symmetric_without_pseudometric() {
    let times = [0.0, 1.0, 2.5, 3.0];
    let a = PathBatch::new(wavy(3 * 4 * 2, 0.1), vec![3], 4, 2).unwrap();
    let b = PathBatch::new(wavy(5 * 4 * 2, 1.7), vec![5], 4, 2).unwrap();

    let d_ab = l2_discrepancy(&times, &a, &b, None).unwrap();
    let d_ba = l2_discrepancy(&times, &b, &a, None).unwrap();

    assert_eq!(d_ab.shape, vec![3, 5]);
    assert_eq!(d_ba.shape, vec![5, 3]);
    for i in 0..3 {
        for j in 0..5 {
            let fwd = d_ab.data[i * 5 + j];
            let rev = d_ba.data[j * 3 + i];
            assert!(
                (fwd - rev).abs() < EPSILON,
                "asymmetry at ({i}, {j}): {fwd} vs {rev}"
            );
        }
    }
}

#[test]
fn broadcast_shape_law() {
    // [3, L, C] x [5, 7, L, C] -> [3, 5, 7]
    let times = [0.0, 0.5, 1.0];
    let p1 = PathBatch::new(wavy(3 * 3 * 2, 0.0), vec![3], 3, 2).unwrap();
    let p2 = PathBatch::new(wavy(5 * 7 * 3 * 2, 0.9), vec![5, 7], 3, 2).unwrap();
    let d = l2_discrepancy(&times, &p1, &p2, None).unwrap();
    assert_eq!(d.shape, vec![3, 5, 7]);
    assert_eq!(d.numel(), 105);
}

#[test]
fn constant_shift_scaling_law() {
    // Flat equal paths, then shift path2 by a constant vector c: the
    // discrepancy changes by exactly |c|^2 * (times[-1] - times[0]).
    let times = [0.0, 1.0, 2.0];
    let flat = vec![0.5, -0.2, 0.5, -0.2, 0.5, -0.2];
    let p1 = PathBatch::single(flat.clone(), 3, 2).unwrap();
    let p2 = PathBatch::single(flat.clone(), 3, 2).unwrap();

    let base = l2_discrepancy(&times, &p1, &p2, None).unwrap().item();
    assert_eq!(base, 0.0);

    let c = [0.3, -0.4];
    let shifted: Vec<f64> = flat
        .iter()
        .enumerate()
        .map(|(i, &v)| v + c[i % 2])
        .collect();
    let p2_shifted = PathBatch::single(shifted, 3, 2).unwrap();
    let d = l2_discrepancy(&times, &p1, &p2_shifted, None).unwrap().item();

    let c_norm_sq = c[0] * c[0] + c[1] * c[1]; // 0.25
    let expected = c_norm_sq * (times[2] - times[0]); // 0.5
    assert!(
        (d - base - expected).abs() < EPSILON,
        "scaling law violated: got {d}, expected {expected}"
    );
}

#[test]
fn length_one_path_is_degenerate() {
    let p = PathBatch::single(vec![1.0, 2.0], 1, 2).unwrap();
    let err = l2_discrepancy(&[0.0], &p, &p.clone(), None).unwrap_err();
    assert_eq!(err, DiscrepancyError::DegeneratePath { length: 1 });
}

#[test]
fn linear_parameter_gradient_matches_finite_differences() {
    let times = [0.0, 0.8, 1.6, 2.0];
    let p1 = PathBatch::new(wavy(2 * 4 * 2, 0.2), vec![2], 4, 2).unwrap();
    let p2 = PathBatch::new(wavy(3 * 4 * 2, 1.1), vec![3], 4, 2).unwrap();
    let weight: Vec<f64> = vec![0.8, -0.4, 0.3, 1.2];
    let w = LinearMap::from_weight(2, weight.clone()).unwrap();

    // Loss = sum of all pairwise discrepancies (grad_output of ones)
    let ones = Tensor::ones(vec![2, 3]);
    let grads = l2_discrepancy_backward(&times, &p1, &p2, Some(&w), &ones).unwrap();
    let analytic = grads.linear.expect("pseudometric gradient must exist");

    let loss = |weights: &[f64]| -> f64 {
        let w = LinearMap::from_weight(2, weights.to_vec()).unwrap();
        l2_discrepancy(&times, &p1, &p2, Some(&w))
            .unwrap()
            .data
            .iter()
            .sum()
    };

    let eps = 1e-6;
    for idx in 0..4 {
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
fn traced_evaluation_matches_plain() {
    let times = [0.0, 1.0, 2.0];
    let disc = L2Discrepancy::with_linear(
        LinearMap::from_weight(2, vec![1.0, 0.2, -0.1, 0.9]).unwrap(),
    );
    let p1 = PathBatch::new(wavy(2 * 3 * 2, 0.4), vec![2], 3, 2).unwrap();
    let p2 = PathBatch::new(wavy(4 * 3 * 2, 2.2), vec![4], 3, 2).unwrap();

    let plain = disc.evaluate(&times, &p1, &p2).unwrap();
    let (traced, tape) = disc.evaluate_traced(&times, &p1, &p2).unwrap();
    assert_eq!(plain, traced);

    let grads = disc.backward(&tape, &Tensor::ones(vec![2, 4])).unwrap();
    assert_eq!(grads.path1.batch_shape(), &[2]);
    assert_eq!(grads.path2.batch_shape(), &[4]);
    assert!(grads.linear.is_some());
}

#[test]
fn parallel_and_serial_agree_on_large_batches() {
    // Large enough to cross the parallel-dispatch threshold; the fused pair
    // kernel must give identical values regardless of dispatch.
    let times: Vec<f64> = (0..10).map(|i| i as f64 * 0.25).collect();
    let p1 = PathBatch::new(wavy(16 * 10 * 3, 0.5), vec![16], 10, 3).unwrap();
    let p2 = PathBatch::new(wavy(20 * 10 * 3, 1.9), vec![20], 10, 3).unwrap();

    let d = l2_discrepancy(&times, &p1, &p2, None).unwrap();
    assert_eq!(d.shape, vec![16, 20]);

    // Spot-check a few pairs against single-pair evaluations
    for (i, j) in [(0, 0), (7, 13), (15, 19)] {
        let a = PathBatch::single(p1.path(i).to_vec(), 10, 3).unwrap();
        let b = PathBatch::single(p2.path(j).to_vec(), 10, 3).unwrap();
        let single = l2_discrepancy(&times, &a, &b, None).unwrap().item();
        let batched = d.data[i * 20 + j];
        assert!(
            (single - batched).abs() < EPSILON,
            "pair ({i}, {j}): single={single}, batched={batched}"
        );
    }
}

#[test]
fn pseudometric_checkpoint_round_trip() {
    let disc = L2Discrepancy::new(3);
    let json = serde_json::to_string(&disc).unwrap();
    let restored: L2Discrepancy = serde_json::from_str(&json).unwrap();
    assert_eq!(disc, restored);
    assert_eq!(restored.linear().unwrap().dim(), 3);
}
