use approx::assert_abs_diff_eq;
use num_complex::Complex64;
use pxmcmc_rs::{
    harmonic::hp_size,
    prior::{soft, soft_all, AnalysisL1, Regularizer, SynthesisL1},
    sampling::{GaussLegendre, Healpix},
    tiling::{WaveletBasis, WaveletParams},
    transform::{HarmonicTransform, SphericalWaveletTransform, TransformPair, WaveletSpace},
};
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn random_complex(rng: &mut SmallRng, n: usize) -> Vec<Complex64> {
    (0..n)
        .map(|_| Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect()
}

#[test]
fn repeated_thresholding() {
    let mut rng = SmallRng::seed_from_u64(1);
    let x = random_complex(&mut rng, 500);

    for threshold in [0.0, 0.1, 0.5, 1.0, 2.0] {
        let once = soft_all(&x, threshold);
        let twice = soft_all(&once, threshold);

        // Zeroed coefficients stay zero and the survivors shrink once more,
        // exactly as a single pass with the doubled threshold.
        for ((once, twice), double) in once.iter().zip(&twice).zip(soft_all(&x, 2.0 * threshold))
        {
            if once.norm() == 0.0 {
                assert_eq!(*twice, Complex64::new(0.0, 0.0));
            }
            assert!((twice - double).norm() < 1e-14);
        }
    }

    assert_eq!(soft_all(&x, 0.0), x);
}

#[test]
fn sparsity_is_monotone_in_threshold() {
    let mut rng = SmallRng::seed_from_u64(2);
    let x: Vec<f64> = (0..1000).map(|_| rng.gen_range(-3.0..3.0)).collect();

    let mut last = usize::MAX;
    for i in 0..=40 {
        let threshold = i as f64 * 0.1;
        let nonzeros = soft_all(&x, threshold).iter().filter(|&&v| v != 0.0).count();
        println!("threshold {threshold:.1}: {nonzeros} non-zero");
        assert!(nonzeros <= last);
        last = nonzeros;
    }
    assert_eq!(last, 0);
    assert_eq!(soft(0.0f64, 0.0), 0.0);
}

#[test]
fn analysis_proximal_operator() {
    let mut rng = SmallRng::seed_from_u64(3);
    let l = 8;
    let grid = GaussLegendre::new(l).unwrap();
    let basis = WaveletBasis::new(WaveletParams::new(l, 2.0, 1)).unwrap();
    let t = SphericalWaveletTransform::new(basis, grid.clone(), WaveletSpace::Harmonic).unwrap();

    // A bandlimited field, reconstructed exactly by the transform.
    let field = HarmonicTransform::new(grid, l)
        .unwrap()
        .to_pixel(&random_complex(&mut rng, hp_size(l)))
        .unwrap();

    let keep = AnalysisL1::new(&t, 0.0).unwrap();
    let kept = keep.proxf(&field).unwrap();
    assert_eq!(kept, field);

    let kill = AnalysisL1::new(&t, 1e6).unwrap();
    let killed = kill.proxf(&field).unwrap();
    for v in killed {
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-9);
    }

    // For a field the transform reconstructs, the proximal operator is the
    // synthesis of the thresholded coefficients.
    let shrink = AnalysisL1::new(&t, 0.05).unwrap();
    let shrunk = shrink.proxf(&field).unwrap();
    let expected = t
        .synthesize(&soft_all(&t.analyze(&field).unwrap(), 0.05))
        .unwrap();
    for (a, b) in shrunk.iter().zip(&expected) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
    assert_eq!(shrink.prior(&field).unwrap(), field.iter().map(|x| x.abs()).sum::<f64>());
}

#[test]
fn density_weighted_synthesis_prior() {
    let mut rng = SmallRng::seed_from_u64(4);
    let hpx = Healpix::new(2).unwrap();
    let basis = WaveletBasis::new(WaveletParams::new(4, 1.5, 1)).unwrap();

    let harmonic =
        SphericalWaveletTransform::new(basis.clone(), hpx.clone(), WaveletSpace::Harmonic).unwrap();
    assert!(harmonic.density_weights().is_none());

    let t = SphericalWaveletTransform::new(basis, hpx, WaveletSpace::Pixel).unwrap();
    let weights = t.density_weights().unwrap();
    assert_eq!(weights.len(), t.coeff_len());

    let reg = SynthesisL1::weighted(0.2, weights.clone()).unwrap();
    let x = random_complex(&mut rng, t.coeff_len());
    let prox = reg.proxf(&x).unwrap();
    for ((x, p), w) in x.iter().zip(&prox).zip(&weights) {
        assert!((soft(*x, 0.2 * w) - p).norm() < 1e-14);
    }

    let plain = SynthesisL1::<Complex64>::new(0.2).unwrap();
    let expected: f64 = x.iter().zip(&weights).map(|(x, w)| w * x.norm()).sum();
    assert_abs_diff_eq!(reg.prior(&x).unwrap(), expected, epsilon = 1e-12);
    assert!(plain.prior(&x).unwrap() > 0.0);
}
