use super::config::{Extremum, Saturation, TransformConfig, UncertaintyMode};
use super::error::EngineError;
use crate::core::potential::constants::INFINITE_OPP;
use crate::core::potential::formulas::{self, AsymmetricUncertainty};
use tracing::debug;

/// The reference density every grid point is compared with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub value: f64,
    /// Grid point holding the reference density; `None` for a user-supplied value.
    pub index: Option<usize>,
    pub extremum: Extremum,
}

impl Normalization {
    /// The global maximum of `values`, ignoring NaN. Ties resolve to the first occurrence.
    pub fn maximum(values: &[f64]) -> Result<Self, EngineError> {
        Self::from_extremum(values, Extremum::Maximum)
    }

    pub fn from_extremum(values: &[f64], extremum: Extremum) -> Result<Self, EngineError> {
        if values.is_empty() {
            return Err(EngineError::EmptyGrid);
        }
        let found = match extremum {
            Extremum::Maximum => extreme_point(values, |candidate, best| candidate > best),
            Extremum::Minimum => extreme_point(values, |candidate, best| candidate < best),
            Extremum::Custom(value) => {
                if value == 0.0 || !value.is_finite() {
                    return Err(EngineError::InvalidExtremum(value));
                }
                return Ok(Self {
                    value,
                    index: None,
                    extremum,
                });
            }
        };
        let (index, value) = found.ok_or(EngineError::EmptyGrid)?;
        Ok(Self {
            value,
            index: Some(index),
            extremum,
        })
    }

    /// Uncertainty of the reference density taken from an error map on the same grid.
    pub fn uncertainty_in(&self, sigma: &[f64]) -> f64 {
        self.index.and_then(|i| sigma.get(i)).copied().unwrap_or(0.0)
    }
}

fn extreme_point(values: &[f64], better: impl Fn(f64, f64) -> bool) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if !better(v, b) => best,
            _ => Some((i, v)),
        })
}

/// OPP values of a grid with undefined points kept as `None` until output.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialLayer {
    values: Vec<Option<f64>>,
}

impl PotentialLayer {
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn undefined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    pub fn highest_finite(&self) -> Option<f64> {
        self.values.iter().flatten().copied().reduce(f64::max)
    }

    /// Suggested isosurface level: half the highest finite OPP.
    pub fn isosurface_level(&self) -> f64 {
        self.highest_finite().map_or(0.0, |max| max / 2.0)
    }

    pub fn materialize(&self, saturation: Saturation) -> Vec<f64> {
        let fill = match saturation {
            Saturation::Sentinel => INFINITE_OPP,
            Saturation::HighestFinite => self.highest_finite().unwrap_or(INFINITE_OPP),
        };
        self.values.iter().map(|v| v.unwrap_or(fill)).collect()
    }
}

/// OPP uncertainty of a single grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointUncertainty {
    Symmetric(f64),
    Asymmetric(AsymmetricUncertainty),
}

impl PointUncertainty {
    /// Appends the output columns of this value: one for symmetric, upper then lower for
    /// asymmetric uncertainties.
    pub fn append_to(self, row: &mut Vec<f64>) {
        match self {
            PointUncertainty::Symmetric(value) => row.push(value),
            PointUncertainty::Asymmetric(u) => {
                row.push(u.upper);
                row.push(u.lower);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UncertaintyLayers {
    Symmetric(Vec<f64>),
    Asymmetric { upper: Vec<f64>, lower: Vec<f64> },
}

/// Boltzmann inversion of a density into a one-particle potential at fixed temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialTransform {
    temperature: f64,
    kt: f64,
    mode: UncertaintyMode,
    saturation: Saturation,
}

impl PotentialTransform {
    pub fn new(temperature: f64, config: &TransformConfig) -> Result<Self, EngineError> {
        if !(temperature > 0.0) || !temperature.is_finite() {
            return Err(EngineError::InvalidTemperature(temperature));
        }
        let kt = formulas::thermal_energy(temperature);
        debug!(temperature, kt, mode = %config.uncertainty_mode, "Prepared potential transform.");
        Ok(Self {
            temperature,
            kt,
            mode: config.uncertainty_mode,
            saturation: config.saturation,
        })
    }

    pub fn from_config(config: &TransformConfig) -> Result<Self, EngineError> {
        Self::new(config.temperature, config)
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn thermal_energy(&self) -> f64 {
        self.kt
    }

    pub fn uncertainty_mode(&self) -> UncertaintyMode {
        self.mode
    }

    pub fn saturation(&self) -> Saturation {
        self.saturation
    }

    /// OPP at a point of density `density`, or `None` where it is undefined.
    ///
    /// Against a maximum, only positive densities have a potential; against other references
    /// the density ratio must be positive.
    #[inline]
    pub fn potential(&self, density: f64, reference: &Normalization) -> Option<f64> {
        if reference.extremum == Extremum::Maximum && !(density > 0.0) {
            return None;
        }
        formulas::one_particle_potential(density / reference.value, self.kt)
    }

    #[inline]
    pub fn uncertainty(
        &self,
        density: f64,
        sigma: f64,
        reference: &Normalization,
        sigma_reference: f64,
    ) -> PointUncertainty {
        match self.mode {
            UncertaintyMode::Symmetric => PointUncertainty::Symmetric(
                formulas::symmetric_uncertainty(
                    density,
                    sigma,
                    reference.value,
                    sigma_reference,
                    self.kt,
                ),
            ),
            UncertaintyMode::Asymmetric => PointUncertainty::Asymmetric(
                formulas::asymmetric_uncertainty(
                    density,
                    sigma,
                    reference.value,
                    sigma_reference,
                    self.kt,
                ),
            ),
        }
    }

    pub fn potential_layer(&self, density: &[f64], reference: &Normalization) -> PotentialLayer {
        PotentialLayer {
            values: density
                .iter()
                .map(|&d| self.potential(d, reference))
                .collect(),
        }
    }

    /// Value substituted for undefined potentials of `density`, without building a layer.
    pub fn saturation_value(&self, density: &[f64], reference: &Normalization) -> f64 {
        match self.saturation {
            Saturation::Sentinel => INFINITE_OPP,
            Saturation::HighestFinite => density
                .iter()
                .filter_map(|&d| self.potential(d, reference))
                .reduce(f64::max)
                .unwrap_or(INFINITE_OPP),
        }
    }

    /// Materializes `layer` with this transform's saturation policy.
    pub fn materialize(&self, layer: &PotentialLayer) -> Vec<f64> {
        layer.materialize(self.saturation)
    }

    pub fn uncertainty_layers(
        &self,
        density: &[f64],
        sigma: &[f64],
        reference: &Normalization,
    ) -> UncertaintyLayers {
        let sigma_reference = reference.uncertainty_in(sigma);
        let points = density.iter().zip(sigma);
        match self.mode {
            UncertaintyMode::Symmetric => UncertaintyLayers::Symmetric(
                points
                    .map(|(&d, &s)| {
                        formulas::symmetric_uncertainty(d, s, reference.value, sigma_reference, self.kt)
                    })
                    .collect(),
            ),
            UncertaintyMode::Asymmetric => {
                let (upper, lower) = points
                    .map(|(&d, &s)| {
                        let u = formulas::asymmetric_uncertainty(
                            d,
                            s,
                            reference.value,
                            sigma_reference,
                            self.kt,
                        );
                        (u.upper, u.lower)
                    })
                    .unzip();
                UncertaintyLayers::Asymmetric { upper, lower }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::TransformConfigBuilder;

    const SCENARIO: [f64; 9] = [1.0, 2.0, 1.0, 2.0, 9.0, 2.0, 1.0, 2.0, 1.0];

    fn transform(mode: UncertaintyMode, saturation: Saturation) -> PotentialTransform {
        let config = TransformConfigBuilder::new()
            .temperature(300.0)
            .uncertainty_mode(mode)
            .saturation(saturation)
            .build()
            .unwrap();
        PotentialTransform::from_config(&config).unwrap()
    }

    fn default_transform() -> PotentialTransform {
        transform(UncertaintyMode::Asymmetric, Saturation::Sentinel)
    }

    #[test]
    fn invalid_temperatures_are_rejected() {
        let config = TransformConfigBuilder::new().temperature(1.0).build().unwrap();
        for t in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                PotentialTransform::new(t, &config),
                Err(EngineError::InvalidTemperature(_))
            ));
        }
    }

    #[test]
    fn scenario_grid_has_zero_at_maximum_and_expected_corner_value() {
        let reference = Normalization::maximum(&SCENARIO).unwrap();
        assert_eq!(reference.index, Some(4));
        assert_eq!(reference.value, 9.0);

        let layer = default_transform().potential_layer(&SCENARIO, &reference);
        let opp = layer.materialize(Saturation::Sentinel);
        assert_eq!(opp[4], 0.0);
        assert!((opp[0] - 0.0568).abs() < 1e-4);
        assert!((opp[1] - 0.0389).abs() < 1e-4);
        assert_eq!(layer.undefined_count(), 0);
    }

    #[test]
    fn potential_decreases_with_increasing_density() {
        let reference = Normalization::maximum(&[10.0]).unwrap();
        let t = default_transform();
        let mut previous = f64::INFINITY;
        for density in [0.01, 0.1, 1.0, 5.0, 10.0] {
            let opp = t.potential(density, &reference).unwrap();
            assert!(opp < previous);
            previous = opp;
        }
    }

    #[test]
    fn non_positive_densities_saturate_per_policy() {
        let values = [4.0, 0.0, -1.0, 1.0];
        let reference = Normalization::maximum(&values).unwrap();
        let t = transform(UncertaintyMode::Asymmetric, Saturation::Sentinel);
        let layer = t.potential_layer(&values, &reference);
        assert_eq!(layer.undefined_count(), 2);

        let sentinel = t.materialize(&layer);
        assert_eq!(sentinel[1], INFINITE_OPP);
        assert_eq!(sentinel[2], INFINITE_OPP);

        let highest = layer.materialize(Saturation::HighestFinite);
        let expected = t.thermal_energy() * 4.0_f64.ln();
        assert!((highest[1] - expected).abs() < 1e-12);
        assert_eq!(highest[1], highest[3]);
        assert!((layer.isosurface_level() - expected / 2.0).abs() < 1e-12);

        assert_eq!(t.saturation_value(&values, &reference), INFINITE_OPP);
        let streaming = transform(UncertaintyMode::Asymmetric, Saturation::HighestFinite);
        assert_eq!(streaming.saturation_value(&values, &reference), highest[1]);
    }

    #[test]
    fn normalization_ignores_nan_and_rejects_empty_grids() {
        let reference = Normalization::maximum(&[f64::NAN, 2.0, 3.0, 3.0]).unwrap();
        assert_eq!(reference.index, Some(2));
        assert!(matches!(
            Normalization::maximum(&[]),
            Err(EngineError::EmptyGrid)
        ));
        assert!(matches!(
            Normalization::maximum(&[f64::NAN]),
            Err(EngineError::EmptyGrid)
        ));
    }

    #[test]
    fn extremum_variants_select_the_reference_density() {
        let values = [-3.0, -1.0, 0.5];
        let minimum = Normalization::from_extremum(&values, Extremum::Minimum).unwrap();
        assert_eq!((minimum.value, minimum.index), (-3.0, Some(0)));

        let t = default_transform();
        assert_eq!(t.potential(-3.0, &minimum), Some(0.0));
        assert!(t.potential(-1.0, &minimum).unwrap() > 0.0);
        assert_eq!(t.potential(0.5, &minimum), None);

        let custom = Normalization::from_extremum(&values, Extremum::Custom(2.0)).unwrap();
        assert_eq!(custom.index, None);
        assert_eq!(custom.uncertainty_in(&[1.0, 1.0, 1.0]), 0.0);
        assert!(matches!(
            Normalization::from_extremum(&values, Extremum::Custom(0.0)),
            Err(EngineError::InvalidExtremum(_))
        ));
    }

    #[test]
    fn asymmetric_layers_pair_sentinels_at_non_positive_density() {
        let density = [4.0, 0.0, 2.0];
        let sigma = [0.4, 0.1, -0.4];
        let reference = Normalization::maximum(&density).unwrap();
        let t = transform(UncertaintyMode::Asymmetric, Saturation::Sentinel);
        match t.uncertainty_layers(&density, &sigma, &reference) {
            UncertaintyLayers::Asymmetric { upper, lower } => {
                assert_eq!((upper[1], lower[1]), (INFINITE_OPP, -INFINITE_OPP));
                assert!(upper[0] > 0.0 && lower[0] < 0.0);
                assert!(upper[2] > upper[0]);
            }
            other => panic!("unexpected layers: {other:?}"),
        }
    }

    #[test]
    fn symmetric_layer_uses_reference_uncertainty_at_maximum() {
        let density = [4.0, 1.0];
        let sigma = [0.4, 0.1];
        let reference = Normalization::maximum(&density).unwrap();
        let t = transform(UncertaintyMode::Symmetric, Saturation::Sentinel);
        let UncertaintyLayers::Symmetric(values) = t.uncertainty_layers(&density, &sigma, &reference)
        else {
            panic!("expected a symmetric layer");
        };
        let expected = t.thermal_energy() * (0.01_f64 + 0.01).sqrt();
        assert!((values[1] - expected).abs() < 1e-15);
    }

    #[test]
    fn repeated_transforms_are_identical() {
        let reference = Normalization::maximum(&SCENARIO).unwrap();
        let t = default_transform();
        let first = t.materialize(&t.potential_layer(&SCENARIO, &reference));
        let second = t.materialize(&t.potential_layer(&SCENARIO, &reference));
        assert_eq!(first, second);
    }

    #[test]
    fn point_uncertainty_appends_one_or_two_columns() {
        let mut row = vec![];
        PointUncertainty::Symmetric(0.1).append_to(&mut row);
        PointUncertainty::Asymmetric(AsymmetricUncertainty::SATURATED).append_to(&mut row);
        assert_eq!(row, vec![0.1, INFINITE_OPP, -INFINITE_OPP]);
    }
}
