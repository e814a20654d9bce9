use crate::distribution::Distribution;
use crate::error::{DiagramError, DiagramResult};
use serde::{Deserialize, Serialize};

/// Options for building a diagram and filling it with sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Number of sites placed by [`crate::Diagram::fill_from_config`].
    pub node_count: usize,
    pub distribution: Distribution,
    /// Run insertions without waiting on the step gate.
    pub manual_mode: bool,
    /// Seed for site generation. A fresh seed is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            node_count: 30,
            distribution: Distribution::Random,
            manual_mode: true,
            seed: None,
        }
    }
}

impl DiagramConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_node_count(mut self, count: usize) -> Self {
        self.node_count = count;
        self
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_manual_mode(mut self, manual: bool) -> Self {
        self.manual_mode = manual;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_json(json: &str) -> DiagramResult<Self> {
        let config: DiagramConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> DiagramResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> DiagramResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DiagramError::InvalidInput(format!(
                "canvas dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
