// src/engine/config.rs
//
// Pipeline-wide configuration with environment overrides.

use crate::engine::binding::DEFAULT_DECODE_BUDGET_BYTES;
use crate::engine::color::ColorAnalyzerConfig;
use crate::engine::geometry::CropPolicy;
use crate::engine::validation::ValidationConfig;
use std::str::FromStr;

const BYTES_PER_MB: u64 = 1024 * 1024;

pub const ENV_MAX_UPLOAD_MB: &str = "LAZY_CANVAS_MAX_UPLOAD_MB";
pub const ENV_CROP_POLICY: &str = "LAZY_CANVAS_CROP_POLICY";
pub const ENV_DECODE_BUDGET_MB: &str = "LAZY_CANVAS_DECODE_BUDGET_MB";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub validation: ValidationConfig,
    pub color: ColorAnalyzerConfig,
    pub crop_policy: CropPolicy,
    /// Decoded bytes allowed in flight across concurrent decodes.
    pub decode_budget_bytes: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            validation: ValidationConfig::default(),
            color: ColorAnalyzerConfig::default(),
            crop_policy: CropPolicy::default(),
            decode_budget_bytes: DEFAULT_DECODE_BUDGET_BYTES,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `LAZY_CANVAS_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Values that fail to parse are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mb) = parse_var::<u64, _>(&lookup, ENV_MAX_UPLOAD_MB) {
            self.validation = self.validation.with_max_megabytes(mb);
        }
        if let Some(policy) = parse_var::<CropPolicy, _>(&lookup, ENV_CROP_POLICY) {
            self.crop_policy = policy;
        }
        if let Some(mb) = parse_var::<u64, _>(&lookup, ENV_DECODE_BUDGET_MB) {
            self.decode_budget_bytes = mb.saturating_mul(BYTES_PER_MB).max(1);
        }
        self
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_color(mut self, color: ColorAnalyzerConfig) -> Self {
        self.color = color;
        self
    }

    pub fn with_crop_policy(mut self, crop_policy: CropPolicy) -> Self {
        self.crop_policy = crop_policy;
        self
    }

    pub fn with_decode_budget_bytes(mut self, bytes: u64) -> Self {
        self.decode_budget_bytes = bytes.max(1);
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}
