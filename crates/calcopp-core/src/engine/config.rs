use crate::core::io::stf::SectionMarkers;
use crate::core::models::layers::LayerSelection;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Estimator used for the OPP uncertainty layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UncertaintyMode {
    /// First-order quadrature propagation, one symmetric value per point.
    Symmetric,
    /// Differenced one-sided potentials, an upper and a lower deviation per point.
    #[default]
    Asymmetric,
}

impl fmt::Display for UncertaintyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UncertaintyMode::Symmetric => write!(f, "symmetric"),
            UncertaintyMode::Asymmetric => write!(f, "asymmetric"),
        }
    }
}

/// Value written where the OPP is undefined (non-positive density).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Saturation {
    /// The literal `INFINITE_OPP` sentinel.
    #[default]
    Sentinel,
    /// The highest finite OPP of the same grid.
    HighestFinite,
}

impl fmt::Display for Saturation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Saturation::Sentinel => write!(f, "sentinel"),
            Saturation::HighestFinite => write!(f, "highest-finite"),
        }
    }
}

/// Reference density of a scatterer-density grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extremum {
    Maximum,
    /// For species with negative scattering lengths.
    Minimum,
    Custom(f64),
}

impl Default for Extremum {
    fn default() -> Self {
        Extremum::Maximum
    }
}

impl fmt::Display for Extremum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extremum::Maximum => write!(f, "maximum"),
            Extremum::Minimum => write!(f, "minimum"),
            Extremum::Custom(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformConfig {
    /// Temperature in K.
    pub temperature: f64,
    pub uncertainty_mode: UncertaintyMode,
    pub saturation: Saturation,
    pub layers: LayerSelection,
    pub markers: SectionMarkers,
    pub extremum: Extremum,
}

#[derive(Default)]
pub struct TransformConfigBuilder {
    temperature: Option<f64>,
    uncertainty_mode: Option<UncertaintyMode>,
    saturation: Option<Saturation>,
    layers: Option<LayerSelection>,
    markers: Option<SectionMarkers>,
    extremum: Option<Extremum>,
}

impl TransformConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn uncertainty_mode(mut self, mode: UncertaintyMode) -> Self {
        self.uncertainty_mode = Some(mode);
        self
    }
    pub fn saturation(mut self, saturation: Saturation) -> Self {
        self.saturation = Some(saturation);
        self
    }
    pub fn layers(mut self, layers: LayerSelection) -> Self {
        self.layers = Some(layers);
        self
    }
    pub fn markers(mut self, markers: SectionMarkers) -> Self {
        self.markers = Some(markers);
        self
    }
    pub fn extremum(mut self, extremum: Extremum) -> Self {
        self.extremum = Some(extremum);
        self
    }

    pub fn build(self) -> Result<TransformConfig, ConfigError> {
        Ok(TransformConfig {
            temperature: self
                .temperature
                .ok_or(ConfigError::MissingParameter("temperature"))?,
            uncertainty_mode: self.uncertainty_mode.unwrap_or_default(),
            saturation: self.saturation.unwrap_or_default(),
            layers: self.layers.unwrap_or_default(),
            markers: self.markers.unwrap_or_default(),
            extremum: self.extremum.unwrap_or_default(),
        })
    }
}
