use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A quantity that can be written to the output of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputLayer {
    #[serde(rename = "pdf")]
    Pdf,
    #[serde(rename = "pdf-err", alias = "pdferr")]
    PdfUncertainty,
    #[serde(rename = "opp")]
    Opp,
    #[serde(rename = "opp-err", alias = "opperr")]
    OppUncertainty,
}

static LAYER_KEYWORDS: Map<&'static str, OutputLayer> = phf_map! {
    "pdf" => OutputLayer::Pdf,
    "pdf-err" => OutputLayer::PdfUncertainty,
    "pdferr" => OutputLayer::PdfUncertainty,
    "opp" => OutputLayer::Opp,
    "opp-err" => OutputLayer::OppUncertainty,
    "opperr" => OutputLayer::OppUncertainty,
};

impl OutputLayer {
    pub const ALL: [OutputLayer; 4] = [
        OutputLayer::Pdf,
        OutputLayer::PdfUncertainty,
        OutputLayer::Opp,
        OutputLayer::OppUncertainty,
    ];

    /// Layers that can only be produced from a consistent error map.
    pub fn requires_error_map(self) -> bool {
        matches!(self, OutputLayer::PdfUncertainty | OutputLayer::OppUncertainty)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            OutputLayer::Pdf => "pdf",
            OutputLayer::PdfUncertainty => "pdf-err",
            OutputLayer::Opp => "opp",
            OutputLayer::OppUncertainty => "opp-err",
        }
    }
}

impl fmt::Display for OutputLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown output layer '{0}'. Expected one of 'pdf', 'pdf-err', 'opp', 'opp-err'.")]
pub struct UnknownLayerError(pub String);

impl FromStr for OutputLayer {
    type Err = UnknownLayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LAYER_KEYWORDS
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| UnknownLayerError(s.to_string()))
    }
}

/// The set of layers requested for a run.
///
/// An empty request selects every layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSelection {
    layers: BTreeSet<OutputLayer>,
}

impl Default for LayerSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl LayerSelection {
    pub fn all() -> Self {
        Self {
            layers: OutputLayer::ALL.into_iter().collect(),
        }
    }

    pub fn from_requested<I>(requested: I) -> Self
    where
        I: IntoIterator<Item = OutputLayer>,
    {
        let layers: BTreeSet<_> = requested.into_iter().collect();
        if layers.is_empty() {
            Self::all()
        } else {
            Self { layers }
        }
    }

    pub fn contains(&self, layer: OutputLayer) -> bool {
        self.layers.contains(&layer)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = OutputLayer> + '_ {
        self.layers.iter().copied()
    }

    pub fn requires_error_map(&self) -> bool {
        self.iter().any(OutputLayer::requires_error_map)
    }

    /// The selection with every error-map-dependent layer removed.
    ///
    /// Unlike [`LayerSelection::from_requested`], the result may be empty.
    pub fn without_uncertainty(&self) -> Self {
        Self {
            layers: self
                .layers
                .iter()
                .copied()
                .filter(|l| !l.requires_error_map())
                .collect(),
        }
    }
}
