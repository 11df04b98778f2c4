//! Run configuration (§3 ambient addition): a plain, immutable-after-
//! construction struct carrying every option the drivers and the NRPT
//! controller recognize, deserializable from a JSON config file via
//! `serde_json`.

use serde::{Deserialize, Serialize};

use crate::McmcError;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct NrptConfig {
    pub discard_initial: usize,
    pub thinning: usize,
    pub swap_every: usize,
    pub n_tune: usize,
    pub n_sample: usize,
    pub progress: bool,
    pub seed: u64,
}

impl Default for NrptConfig {
    fn default() -> Self {
        Self {
            discard_initial: 0,
            thinning: 1,
            swap_every: 1,
            n_tune: 16,
            n_sample: 1000,
            progress: true,
            seed: 0,
        }
    }
}

impl NrptConfig {
    /// Load and merge a JSON config file; fields absent from the file keep
    /// their [`Default`] value, matching `#[serde(default)]` field-by-field.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| McmcError::invalid(format!("cannot read config file {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| McmcError::invalid(format!("malformed config file {}: {e}", path.display())))
    }

    pub fn nrpt_options(&self) -> crate::tempering::NrptOptions {
        crate::tempering::NrptOptions {
            swap_every: self.swap_every,
            n_tune: self.n_tune,
            n_sample: self.n_sample,
            progress: self.progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = NrptConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: NrptConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.n_tune, config.n_tune);
        assert_eq!(parsed.n_sample, config.n_sample);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let parsed: NrptConfig = serde_json::from_str(r#"{"n_tune": 32}"#).unwrap();
        assert_eq!(parsed.n_tune, 32);
        assert_eq!(parsed.n_sample, NrptConfig::default().n_sample);
    }
}
