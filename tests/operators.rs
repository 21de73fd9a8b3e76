use num_complex::Complex64;
use pxmcmc_rs::{
    coefficient::{inner, Coefficient},
    error::Error,
    measurement::{Identity, Measurement, PathIntegral},
    operator::{AnalysisOperator, ForwardOperator, Mode, SynthesisOperator},
    routing::{PathDataset, PathRecord, PathRoutingMatrix},
    sampling::{GaussLegendre, Healpix, Sampling},
    tiling::{WaveletBasis, WaveletParams},
    transform::{SphericalWaveletTransform, TransformPair, WaveletSpace},
};
use rand::{rngs::SmallRng, Rng, SeedableRng};

const STEP: f64 = 1e-3;
const GRADIENT_ERROR: f64 = 1e-6;

trait RandomCoefficient: Coefficient {
    fn random(rng: &mut SmallRng) -> Self;
}

impl RandomCoefficient for f64 {
    fn random(rng: &mut SmallRng) -> Self {
        rng.gen_range(-1.0..1.0)
    }
}

impl RandomCoefficient for Complex64 {
    fn random(rng: &mut SmallRng) -> Self {
        Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
    }
}

fn random_vec<T: RandomCoefficient>(rng: &mut SmallRng, n: usize) -> Vec<T> {
    (0..n).map(|_| T::random(rng)).collect()
}

fn random_paths(rng: &mut SmallRng, n: usize) -> PathDataset {
    let records = (0..n)
        .map(|_| PathRecord {
            start: (rng.gen_range(-70.0..70.0), rng.gen_range(-180.0..180.0)),
            stop: (rng.gen_range(-70.0..70.0), rng.gen_range(-180.0..180.0)),
            value: rng.gen_range(-1.0..1.0),
            uncertainty: rng.gen_range(0.1..0.3),
        })
        .collect();
    PathDataset::new(records).unwrap()
}

fn transform<S: Sampling>(
    sampling: S,
    (l, b, j_min): (usize, f64, usize),
    space: WaveletSpace,
) -> SphericalWaveletTransform<S> {
    let basis = WaveletBasis::new(WaveletParams::new(l, b, j_min)).unwrap();
    SphericalWaveletTransform::new(basis, sampling, space).unwrap()
}

/// Compares the gradient with central differences of the misfit along random
/// directions. The misfit is quadratic, so central differences are exact up
/// to rounding.
fn check_gradient<F>(op: &F, rng: &mut SmallRng)
where
    F: ForwardOperator,
    F::Param: RandomCoefficient,
{
    let n = op.nparams();
    let x: Vec<F::Param> = random_vec(rng, n);
    let gradient = op.calc_gradg(&op.forward(&x).unwrap()).unwrap();
    assert_eq!(gradient.len(), n);

    for _ in 0..3 {
        let direction: Vec<F::Param> = random_vec(rng, n);
        let shifted = |sign: f64| -> Vec<F::Param> {
            x.iter()
                .zip(&direction)
                .map(|(&x, &d)| x + d.scale(sign * STEP))
                .collect()
        };

        let plus = op.data_fidelity(&shifted(1.0)).unwrap();
        let minus = op.data_fidelity(&shifted(-1.0)).unwrap();
        let numerical = (plus - minus) / (2.0 * STEP);
        let analytical = inner(&gradient, &direction);

        let error = (numerical - analytical).abs() / analytical.abs().max(1.0);
        println!(
            "{} mode: analytical {analytical}, numerical {numerical}, error {error}",
            op.mode()
        );
        assert!(error < GRADIENT_ERROR);
    }
}

#[test]
fn analysis_gradient_through_path_integral() {
    let mut rng = SmallRng::seed_from_u64(42);
    let hpx = Healpix::new(4).unwrap();
    let dataset = random_paths(&mut rng, 30);
    let matrix = PathRoutingMatrix::build(&dataset, &hpx, None).unwrap();

    let t = transform(hpx, (8, 2.0, 1), WaveletSpace::Harmonic);
    let op = AnalysisOperator::new(
        t,
        PathIntegral::new(matrix),
        dataset.data(),
        dataset.sig_d(),
    )
    .unwrap();
    assert_eq!(op.mode(), Mode::Analysis);
    assert_eq!(op.nparams(), 192);
    check_gradient(&op, &mut rng);
}

#[test]
fn synthesis_gradient_through_path_integral() {
    let mut rng = SmallRng::seed_from_u64(43);
    let hpx = Healpix::new(4).unwrap();
    let dataset = random_paths(&mut rng, 30);
    let matrix = PathRoutingMatrix::build(&dataset, &hpx, None).unwrap();

    for space in [WaveletSpace::Harmonic, WaveletSpace::Pixel] {
        let t = transform(hpx.clone(), (8, 2.0, 1), space);
        let nparams = t.nparams();
        let op = SynthesisOperator::new(
            t,
            PathIntegral::new(matrix.clone()),
            dataset.data(),
            dataset.sig_d(),
        )
        .unwrap();
        assert_eq!(op.mode(), Mode::Synthesis);
        assert_eq!(op.nparams(), nparams);
        check_gradient(&op, &mut rng);
    }
}

#[test]
fn synthesis_gradient_on_gauss_legendre_grid() {
    let mut rng = SmallRng::seed_from_u64(44);
    for (l, b, j_min) in [(4, 1.5, 1), (6, 2.0, 0), (10, 1.8, 2)] {
        let grid = GaussLegendre::new(l).unwrap();
        let npix = grid.npix();
        let data: Vec<f64> = random_vec(&mut rng, npix);

        for space in [WaveletSpace::Harmonic, WaveletSpace::Pixel] {
            let t = transform(grid.clone(), (l, b, j_min), space);
            let op = SynthesisOperator::new(t, Identity::new(npix), data.clone(), 0.7).unwrap();
            check_gradient(&op, &mut rng);
        }
    }
}

#[test]
fn end_to_end_identity_measurement() {
    let mut rng = SmallRng::seed_from_u64(4);
    let hpx = Healpix::new(2).unwrap();
    let npix = hpx.npix();
    let sig_d = 0.25;

    let mut data: Vec<f64> = random_vec(&mut rng, npix);
    let mean = data.iter().sum::<f64>() / npix as f64;
    data.iter_mut().for_each(|x| *x -= mean);

    let t = transform(hpx.clone(), (4, 1.5, 1), WaveletSpace::Harmonic);
    assert_eq!(t.nscales(), 3);
    let op = AnalysisOperator::new(t, Identity::new(npix), data.clone(), sig_d).unwrap();
    assert_eq!(op.nparams(), npix);
    assert_eq!(op.sig_d(), sig_d);

    let zeros = vec![0.0; op.nparams()];
    let prediction = op.forward(&zeros).unwrap();
    assert!(prediction.iter().all(|&p| p == 0.0));

    let gradient = op.calc_gradg(&prediction).unwrap();
    for (g, d) in gradient.iter().zip(&data) {
        assert!((g + d / (sig_d * sig_d)).abs() < 1e-12);
    }

    // The same problem sampled in wavelet coefficients.
    let t = transform(hpx, (4, 1.5, 1), WaveletSpace::Harmonic);
    let expected = t.backwards_adjoint(&gradient).unwrap();
    let op = SynthesisOperator::new(t, Identity::new(npix), data, sig_d).unwrap();
    let zeros = vec![Complex64::new(0.0, 0.0); op.nparams()];
    let prediction = op.forward(&zeros).unwrap();
    assert!(prediction.iter().all(|&p| p.abs() < 1e-15));
    let gradient = op.calc_gradg(&prediction).unwrap();
    assert!(gradient
        .iter()
        .zip(&expected)
        .all(|(a, b)| (a - b).norm() < 1e-12));
}

#[test]
fn path_integral_from_cached_dataset() {
    let dataset = PathDataset::from_reader(
        "\
# lat lon lat lon value sigma
 10  20 -15  80  1.5 0.2
-40 100  30 170 -0.5 0.1
  0   0   0  90  2.0 0.3
"
        .as_bytes(),
    )
    .unwrap();
    let hpx = Healpix::new(4).unwrap();
    let cache = pxmcmc_rs::cache::MemoryCache::new();
    let m = PathIntegral::from_dataset(&dataset, &hpx, None, &cache).unwrap();
    assert_eq!(m.ndata(), 3);

    let ones = vec![1.0; hpx.npix()];
    let lengths = m.forward(&ones).unwrap();
    println!("cells per path: {lengths:?}");
    assert!(lengths.iter().all(|&n| n >= 1.0));

    // A quarter of the equator crosses at least a quarter of the equatorial
    // ring.
    assert!(lengths[2] >= 4.0);
}

#[test]
fn wrong_lengths_are_dimension_errors() {
    let hpx = Healpix::new(2).unwrap();
    let npix = hpx.npix();
    let t = transform(hpx, (4, 1.5, 1), WaveletSpace::Pixel);
    let nparams = t.nparams();
    let op = SynthesisOperator::new(t, Identity::new(npix), vec![0.0; npix], 1.0).unwrap();

    let short = vec![Complex64::new(0.0, 0.0); nparams - 1];
    assert!(matches!(op.forward(&short), Err(Error::Dimension { .. })));
    assert!(matches!(
        op.calc_gradg(&vec![0.0; npix + 1]),
        Err(Error::Dimension { .. })
    ));
    assert!(matches!(
        op.data_fidelity(&short),
        Err(Error::Dimension { .. })
    ));
}
