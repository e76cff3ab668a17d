// End-to-end selection pipelines: sequential QR picking a model size, and
// the sweep engine running a forward-selection session that ends in an OLS
// hand-off.

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use stepwise::criteria::Criterion;
use stepwise::ols;
use stepwise::sequential::SequentialQr;
use stepwise::sweep::{SweepEngine, SweepOptions};

/// `y = X[..,..betas.len()] · betas + noise`, with `k_noise` pure-noise
/// columns appended last.
fn synthetic(n: usize, betas: &[f64], k_noise: usize, seed: u64) -> (Array1<f64>, Array2<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let k = betas.len() + k_noise;
    let exog = Array2::from_shape_fn((n, k), |_| normal.sample(&mut rng));
    let mut endog = Array1::from_shape_fn(n, |_| normal.sample(&mut rng));
    for (j, &beta) in betas.iter().enumerate() {
        endog = endog + &(exog.column(j).to_owned() * beta);
    }
    (endog, exog)
}

#[test]
fn bic_recovers_the_true_model_size_across_noise_draws() {
    // Three informative predictors plus two pure noise columns appended
    // last; the BIC argmin should land on index 2 (three variables) for
    // nearly every draw.
    let mut hits = 0;
    let draws = 10;
    for seed in 0..draws {
        let (endog, exog) = synthetic(200, &[1.2, -1.0, 0.8], 2, 1000 + seed);
        let seq = SequentialQr::new(endog.view(), exog.view(), 0).unwrap();
        if seq.min_ic_idx(Criterion::Bic) == 2 {
            hits += 1;
        }
    }
    assert!(hits >= 8, "BIC found the true size in only {hits}/{draws} draws");
}

#[test]
fn sequential_and_sweep_agree_on_the_same_subset() {
    let (endog, exog) = synthetic(120, &[2.0, -1.5, 1.0], 2, 42);

    // Sequential: prefix model with the first three columns.
    let seq = SequentialQr::new(endog.view(), exog.view(), 0).unwrap();
    let ssr_prefix3 = seq.ssr_all()[2];

    // Sweep: toggle the same three variables in, in arbitrary order.
    let mut engine = SweepEngine::new(endog.view(), exog.view(), SweepOptions::default()).unwrap();
    for k in [1, 2, 0] {
        engine.sweep(k).unwrap();
    }
    assert_abs_diff_eq!(engine.rss_scalar(), ssr_prefix3, epsilon = 1e-6);

    // Both match a direct fit on those columns.
    let fit = ols::fit(endog.view(), exog.select(Axis(1), &[0, 1, 2]).view()).unwrap();
    assert_abs_diff_eq!(engine.rss_scalar(), fit.ssr, epsilon = 1e-6);
    let params = engine.params();
    for i in 0..3 {
        assert_abs_diff_eq!(params[[0, i]], fit.params[i], epsilon = 1e-7);
    }
}

#[test]
fn forward_selection_session_finds_the_informative_set() {
    let (endog, exog) = synthetic(200, &[1.5, -1.2, 0.9], 2, 7);
    let mut engine = SweepEngine::new(endog.view(), exog.view(), SweepOptions::default()).unwrap();

    // Classic forward stepwise: keep entering the excluded candidate with
    // the best F statistic while it clears the threshold.
    let alpha = 1e-3;
    loop {
        let ftest = engine.ftest_sweep().unwrap();
        let candidate = (0..engine.k_vars_x())
            .filter(|&j| !engine.included()[j])
            .min_by(|&a, &b| ftest.p_values[a].partial_cmp(&ftest.p_values[b]).unwrap());
        match candidate {
            Some(j) if ftest.p_values[j] < alpha => engine.sweep(j).unwrap(),
            _ => break,
        }
    }

    let selected: Vec<usize> = (0..engine.k_vars_x())
        .filter(|&j| engine.included()[j])
        .collect();
    assert_eq!(selected, vec![0, 1, 2]);

    // History replay reconstructs the committed pivots.
    let mut previous = vec![false; engine.k_vars_x()];
    let mut replayed = Vec::new();
    for record in engine.history() {
        let flipped: Vec<usize> = (0..engine.k_vars_x())
            .filter(|&j| record.included[j] != previous[j])
            .collect();
        assert_eq!(flipped.len(), 1);
        replayed.push(flipped[0]);
        previous = record.included.clone();
    }
    assert_eq!(replayed.len(), engine.history().len());
    assert_eq!(previous, engine.included());

    // Final hand-off: the authoritative fit on the selected subset agrees
    // with the engine's view of the same model.
    let fit = engine.fit_selected().unwrap();
    assert_abs_diff_eq!(fit.ssr, engine.rss_scalar(), epsilon = 1e-6);
    let params = engine.params();
    for i in 0..selected.len() {
        assert_abs_diff_eq!(fit.params[i], params[[0, i]], epsilon = 1e-7);
        assert!((fit.params[i] - [1.5, -1.2, 0.9][i]).abs() < 0.3);
    }
}
