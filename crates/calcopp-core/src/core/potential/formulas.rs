use super::constants::{BOLTZMANN_CONSTANT_EV, INFINITE_OPP};

/// Thermal energy `k_B T` in eV for a temperature in K.
#[inline]
pub fn thermal_energy(temperature: f64) -> f64 {
    BOLTZMANN_CONSTANT_EV * temperature
}

/// One-particle potential for a density ratio `pdf(u) / pdf_max`.
///
/// Returns `None` where the logarithm is undefined (non-positive or NaN ratio) or the result
/// is not finite.
#[inline]
pub fn one_particle_potential(ratio: f64, kt: f64) -> Option<f64> {
    if !(ratio > 0.0) {
        return None;
    }
    let opp = -kt * ratio.ln();
    opp.is_finite().then_some(opp)
}

/// Symmetric first-order OPP uncertainty (legacy estimator).
///
/// Propagates the relative uncertainties of the local density and of the reference density in
/// quadrature. The correlation between both is ignored, so the estimate is poor close to the
/// density maximum, and the first-order expansion breaks down in low-density bottlenecks. The
/// true OPP distribution is asymmetric even for a symmetric density uncertainty.
#[inline]
pub fn symmetric_uncertainty(
    density: f64,
    sigma: f64,
    reference: f64,
    sigma_reference: f64,
    kt: f64,
) -> f64 {
    if !(density > 0.0) {
        return INFINITE_OPP;
    }
    let value = kt * ((sigma_reference / reference).powi(2) + (sigma / density).powi(2)).sqrt();
    if value.is_finite() { value } else { INFINITE_OPP }
}

/// One-sided OPP deviations obtained from the confidence limits of the densities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsymmetricUncertainty {
    pub upper: f64,
    pub lower: f64,
}

impl AsymmetricUncertainty {
    pub const SATURATED: Self = Self {
        upper: INFINITE_OPP,
        lower: -INFINITE_OPP,
    };
}

/// Asymmetric OPP uncertainty from differenced one-sided potentials.
///
/// The upper deviation pairs the lower confidence limit of the local density with the upper
/// limit of the reference density, the lower deviation the reverse. Uncertainties are used as
/// absolute values since Monte-Carlo error maps may contain negative artifacts. Non-positive
/// densities and non-finite results saturate to `+INFINITE_OPP` (upper) and `-INFINITE_OPP`
/// (lower).
#[inline]
pub fn asymmetric_uncertainty(
    density: f64,
    sigma: f64,
    reference: f64,
    sigma_reference: f64,
    kt: f64,
) -> AsymmetricUncertainty {
    if !(density > 0.0) {
        return AsymmetricUncertainty::SATURATED;
    }
    let local = sigma.abs() / density;
    let global = sigma_reference.abs() / reference;

    let upper = -kt * ((1.0 - local) / (1.0 + global)).ln();
    let lower = -kt * ((1.0 + local) / (1.0 - global)).ln();

    AsymmetricUncertainty {
        upper: if upper.is_finite() { upper } else { INFINITE_OPP },
        lower: if lower.is_finite() { lower } else { -INFINITE_OPP },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn potential_at_reference_density_is_zero() {
        let opp = one_particle_potential(1.0, thermal_energy(300.0)).unwrap();
        assert!(f64_approx_equal(opp, 0.0));
    }

    #[test]
    fn potential_of_one_ninth_at_300_k_matches_reference_value() {
        let opp = one_particle_potential(1.0 / 9.0, thermal_energy(300.0)).unwrap();
        assert!((opp - 0.0568).abs() < 1e-4);
        assert!(f64_approx_equal(opp, thermal_energy(300.0) * 9.0_f64.ln()));
    }

    #[test]
    fn potential_is_undefined_for_non_positive_or_nan_ratio() {
        let kt = thermal_energy(300.0);
        assert_eq!(one_particle_potential(0.0, kt), None);
        assert_eq!(one_particle_potential(-0.5, kt), None);
        assert_eq!(one_particle_potential(f64::NAN, kt), None);
    }

    #[test]
    fn potential_is_non_increasing_in_relative_density() {
        let kt = thermal_energy(150.0);
        let ratios = [1e-6, 1e-3, 0.1, 0.5, 0.9, 1.0];
        let opps: Vec<f64> = ratios
            .iter()
            .map(|&r| one_particle_potential(r, kt).unwrap())
            .collect();
        assert!(opps.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn symmetric_uncertainty_adds_relative_errors_in_quadrature() {
        let kt = thermal_energy(300.0);
        let value = symmetric_uncertainty(2.0, 0.06, 9.0, 0.27, kt);
        let expected = kt * (0.03_f64.powi(2) + 0.03_f64.powi(2)).sqrt();
        assert!(f64_approx_equal(value, expected));
    }

    #[test]
    fn symmetric_uncertainty_saturates_for_non_positive_density() {
        let kt = thermal_energy(300.0);
        assert_eq!(symmetric_uncertainty(0.0, 0.1, 9.0, 0.1, kt), INFINITE_OPP);
        assert_eq!(symmetric_uncertainty(-1.0, 0.1, 9.0, 0.1, kt), INFINITE_OPP);
    }

    #[test]
    fn asymmetric_uncertainty_brackets_zero_for_small_errors() {
        let kt = thermal_energy(300.0);
        let u = asymmetric_uncertainty(2.0, 0.1, 9.0, 0.2, kt);
        assert!(u.upper > 0.0);
        assert!(u.lower < 0.0);
        let expected_upper = -kt * ((1.0_f64 - 0.05) / (1.0 + 0.2 / 9.0)).ln();
        assert!(f64_approx_equal(u.upper, expected_upper));
    }

    #[test]
    fn asymmetric_uncertainty_uses_absolute_sigma() {
        let kt = thermal_energy(300.0);
        let positive = asymmetric_uncertainty(2.0, 0.1, 9.0, 0.2, kt);
        let negative = asymmetric_uncertainty(2.0, -0.1, 9.0, -0.2, kt);
        assert_eq!(positive, negative);
    }

    #[test]
    fn asymmetric_uncertainty_saturates_in_pairs_for_non_positive_density() {
        let kt = thermal_energy(300.0);
        for density in [0.0, -3.0] {
            let u = asymmetric_uncertainty(density, 0.1, 9.0, 0.2, kt);
            assert_eq!(u.upper, INFINITE_OPP);
            assert_eq!(u.lower, -INFINITE_OPP);
        }
    }

    #[test]
    fn asymmetric_uncertainty_saturates_when_lower_confidence_limit_is_not_positive() {
        let kt = thermal_energy(300.0);
        let u = asymmetric_uncertainty(1.0, 1.5, 9.0, 0.2, kt);
        assert_eq!(u.upper, INFINITE_OPP);
        assert!(u.lower.is_finite() && u.lower > -INFINITE_OPP);

        let u = asymmetric_uncertainty(1.0, 0.1, 9.0, 9.0, kt);
        assert_eq!(u.lower, -INFINITE_OPP);
    }
}
