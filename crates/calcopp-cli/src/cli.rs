use calcopp::core::models::layers::OutputLayer;
use calcopp::engine::config::{Extremum, Saturation, UncertaintyMode};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Dennis Wiedemann",
    version,
    about = "CalcOPP - Calculates effective one-particle potentials from probability-density functions and scatterer densities.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a 2D PDF section (STF) into a table of PDF and OPP values.
    Pdf2d(PdfArgs),
    /// Convert a 3D PDF volume (XSF) into OPP grids with a VESTA descriptor.
    Pdf3d(PdfArgs),
    /// Convert a scatterer density (binary PGRID) into an OPP grid.
    Density(DensityArgs),
}

/// Arguments shared by the `pdf2d` and `pdf3d` subcommands.
#[derive(Args, Debug)]
pub struct PdfArgs {
    /// Path to the PDF grid file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to the PDF uncertainty grid (same format and geometry as the PDF).
    #[arg(short, long, value_name = "PATH")]
    pub error: Option<PathBuf>,

    /// Temperature in K, overriding the config file.
    #[arg(short, long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    #[command(flatten)]
    pub layers: LayerFlags,

    /// Estimator for the OPP uncertainty.
    #[arg(long, value_enum, value_name = "MODE")]
    pub uncertainty: Option<UncertaintyArg>,

    /// Value written where the OPP is undefined.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub saturation: Option<SaturationArg>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file and other arguments.
    /// Can be used multiple times. Example: -S transform.temperature=295
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Output layers to produce; without any flag, every layer is produced.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct LayerFlags {
    /// Output the PDF.
    #[arg(long)]
    pub pdf: bool,
    /// Output the PDF uncertainty.
    #[arg(long)]
    pub pdf_err: bool,
    /// Output the OPP.
    #[arg(long)]
    pub opp: bool,
    /// Output the OPP uncertainty.
    #[arg(long)]
    pub opp_err: bool,
}

impl LayerFlags {
    pub fn requested(&self) -> Vec<OutputLayer> {
        [
            (self.pdf, OutputLayer::Pdf),
            (self.pdf_err, OutputLayer::PdfUncertainty),
            (self.opp, OutputLayer::Opp),
            (self.opp_err, OutputLayer::OppUncertainty),
        ]
        .into_iter()
        .filter_map(|(set, layer)| set.then_some(layer))
        .collect()
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UncertaintyArg {
    /// First-order propagation (legacy).
    Symmetric,
    /// Separate upper and lower deviations.
    Asymmetric,
}

impl From<UncertaintyArg> for UncertaintyMode {
    fn from(arg: UncertaintyArg) -> Self {
        match arg {
            UncertaintyArg::Symmetric => UncertaintyMode::Symmetric,
            UncertaintyArg::Asymmetric => UncertaintyMode::Asymmetric,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaturationArg {
    /// Write 1e6 eV.
    Sentinel,
    /// Write the highest finite OPP of the grid.
    HighestFinite,
}

impl From<SaturationArg> for Saturation {
    fn from(arg: SaturationArg) -> Self {
        match arg {
            SaturationArg::Sentinel => Saturation::Sentinel,
            SaturationArg::HighestFinite => Saturation::HighestFinite,
        }
    }
}

/// Arguments for the `density` subcommand.
#[derive(Args, Debug)]
pub struct DensityArgs {
    /// Path to the binary scatterer-density grid.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the binary OPP grid.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Temperature in K, overriding the config file.
    #[arg(short, long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    #[command(flatten)]
    pub reference: ReferenceArgs,

    /// Value written where the OPP is undefined (default: highest-finite).
    #[arg(long, value_enum, value_name = "POLICY")]
    pub saturation: Option<SaturationArg>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file and other arguments.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Reference density the scatterer density is normalized to.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = true, multiple = false)]
pub struct ReferenceArgs {
    /// Normalize to the density maximum (positive scattering lengths).
    #[arg(long)]
    pub maximum: bool,
    /// Normalize to the density minimum (negative scattering lengths).
    #[arg(long)]
    pub minimum: bool,
    /// Normalize to a given density value.
    #[arg(long, value_name = "DENSITY", allow_negative_numbers = true)]
    pub extremum: Option<f64>,
}

impl ReferenceArgs {
    pub fn extremum(&self) -> Extremum {
        match (self.minimum, self.extremum) {
            (_, Some(value)) => Extremum::Custom(value),
            (true, None) => Extremum::Minimum,
            (false, None) => Extremum::Maximum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pdf2d_arguments_parse_with_layer_flags() {
        let cli = Cli::parse_from([
            "calcopp", "-vv", "pdf2d", "-i", "in.stf", "-o", "out.asc", "-e", "err.stf", "-t",
            "295", "--opp", "--opp-err", "--uncertainty", "symmetric",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Pdf2d(args) = cli.command else {
            panic!("expected pdf2d");
        };
        assert_eq!(args.error, Some(PathBuf::from("err.stf")));
        assert_eq!(args.temperature, Some(295.0));
        assert_eq!(
            args.layers.requested(),
            vec![OutputLayer::Opp, OutputLayer::OppUncertainty]
        );
        assert_eq!(args.uncertainty, Some(UncertaintyArg::Symmetric));
    }

    #[test]
    fn density_requires_exactly_one_reference() {
        assert!(
            Cli::try_parse_from(["calcopp", "density", "-i", "a", "-o", "b", "-t", "300"]).is_err()
        );
        assert!(
            Cli::try_parse_from([
                "calcopp", "density", "-i", "a", "-o", "b", "--maximum", "--minimum"
            ])
            .is_err()
        );
        let cli = Cli::parse_from([
            "calcopp", "density", "-i", "a", "-o", "b", "--extremum", "-0.25", "--saturation",
            "highest-finite",
        ]);
        let Commands::Density(args) = cli.command else {
            panic!("expected density");
        };
        assert_eq!(args.reference.extremum(), Extremum::Custom(-0.25));
        assert_eq!(args.saturation, Some(SaturationArg::HighestFinite));
    }
}
