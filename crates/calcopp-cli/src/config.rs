use crate::cli::{DensityArgs, PdfArgs};
use crate::error::{CliError, Result};
use calcopp::core::io::stf::SectionMarkers;
use calcopp::core::models::layers::{LayerSelection, OutputLayer};
use calcopp::engine::config::{
    self as core_config, Extremum, Saturation, TransformConfig, UncertaintyMode,
};
use serde::Deserialize;
use serde::de::IntoDeserializer;
use serde::de::value::{Error as ValueError, StrDeserializer};
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialTransformConfig {
    temperature: Option<f64>,
    uncertainty_mode: Option<UncertaintyMode>,
    saturation: Option<Saturation>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    layers: Option<Vec<OutputLayer>>,
}

/// Settings read from a TOML configuration file, all optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    transform: Option<PartialTransformConfig>,
    output: Option<PartialOutputConfig>,
    markers: Option<SectionMarkers>,
}

fn parse_keyword<'a, T: Deserialize<'a>>(key: &str, value: &'a str) -> Result<T> {
    let deserializer: StrDeserializer<'a, ValueError> = value.trim().into_deserializer();
    T::deserialize(deserializer)
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    fn transform(&mut self) -> &mut PartialTransformConfig {
        self.transform.get_or_insert_with(Default::default)
    }

    /// Combines file settings with the arguments of `pdf2d`/`pdf3d`.
    ///
    /// Precedence, highest first: `--set` values, dedicated arguments, file settings, defaults.
    pub fn merge_with_pdf_args(mut self, args: &PdfArgs) -> Result<TransformConfig> {
        if let Some(t) = args.temperature {
            self.transform().temperature = Some(t);
        }
        if let Some(mode) = args.uncertainty {
            self.transform().uncertainty_mode = Some(mode.into());
        }
        if let Some(saturation) = args.saturation {
            self.transform().saturation = Some(saturation.into());
        }
        let requested = args.layers.requested();
        if !requested.is_empty() {
            self.output
                .get_or_insert_with(Default::default)
                .layers = Some(requested);
        }
        self.apply_set_values(&args.set_values)?;
        self.build(Saturation::Sentinel, Extremum::Maximum)
    }

    /// Combines file settings with the arguments of `density`.
    ///
    /// Undefined potentials default to the highest finite OPP here, which keeps isosurfaces
    /// of the written grid free of spikes.
    pub fn merge_with_density_args(mut self, args: &DensityArgs) -> Result<TransformConfig> {
        if let Some(t) = args.temperature {
            self.transform().temperature = Some(t);
        }
        if let Some(saturation) = args.saturation {
            self.transform().saturation = Some(saturation.into());
        }
        self.apply_set_values(&args.set_values)?;
        self.build(Saturation::HighestFinite, args.reference.extremum())
    }

    fn build(self, default_saturation: Saturation, extremum: Extremum) -> Result<TransformConfig> {
        let transform = self.transform.unwrap_or_default();
        let layers = self
            .output
            .and_then(|o| o.layers)
            .map(LayerSelection::from_requested)
            .unwrap_or_default();

        let mut builder = core_config::TransformConfigBuilder::new()
            .saturation(transform.saturation.unwrap_or(default_saturation))
            .layers(layers)
            .markers(self.markers.unwrap_or_default())
            .extremum(extremum);
        if let Some(t) = transform.temperature {
            builder = builder.temperature(t);
        }
        if let Some(mode) = transform.uncertainty_mode {
            builder = builder.uncertainty_mode(mode);
        }
        builder.build().map_err(|e| {
            CliError::Config(format!(
                "{}. Provide it with --temperature or `transform.temperature` in the config file.",
                e
            ))
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Argument(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let key = key.trim();

            match key {
                "transform.temperature" => {
                    self.transform().temperature =
                        Some(value_str.trim().parse().map_err(|_| {
                            CliError::Config(format!(
                                "Invalid float value for {}: {}",
                                key, value_str
                            ))
                        })?);
                }
                "transform.uncertainty-mode" => {
                    self.transform().uncertainty_mode = Some(parse_keyword(key, value_str)?);
                }
                "transform.saturation" => {
                    self.transform().saturation = Some(parse_keyword(key, value_str)?);
                }
                "output.layers" => {
                    let layers = value_str
                        .split(',')
                        .filter(|s| !s.trim().is_empty())
                        .map(|s| s.parse::<OutputLayer>())
                        .collect::<std::result::Result<Vec<_>, _>>()
                        .map_err(|e| CliError::Config(format!("Invalid value for {}: {}", key, e)))?;
                    self.output.get_or_insert_with(Default::default).layers = Some(layers);
                }
                "markers.dimensions" | "markers.bounds" | "markers.data" => {
                    let marker = value_str.trim();
                    if marker.is_empty() || marker.contains(char::is_whitespace) {
                        return Err(CliError::Config(format!(
                            "Invalid marker for {}: '{}'",
                            key, value_str
                        )));
                    }
                    let markers = self.markers.get_or_insert_with(Default::default);
                    let slot = match key {
                        "markers.dimensions" => &mut markers.dimensions,
                        "markers.bounds" => &mut markers.bounds,
                        _ => &mut markers.data,
                    };
                    *slot = marker.to_string();
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
