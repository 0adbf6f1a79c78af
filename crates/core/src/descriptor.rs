//! Job descriptors and fixed sampling parameters.
//!
//! A [`JobDescriptor`] names one generation request in a batch: the seed,
//! the two Flux prompt fields, and the sampling configuration. The name
//! doubles as the `SaveImage` filename prefix and as part of every
//! destination filename, so it is restricted to a filesystem-safe alphabet.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default sampler step count (Flux schnell converges in very few steps).
pub const DEFAULT_STEPS: u32 = 4;
/// Default classifier-free guidance scale passed to the sampler.
pub const DEFAULT_CFG: f64 = 1.0;
/// Default Flux guidance embedded in the conditioning nodes.
pub const DEFAULT_GUIDANCE: f64 = 3.5;
/// Default latent width in pixels.
pub const DEFAULT_WIDTH: u32 = 512;
/// Default latent height in pixels.
pub const DEFAULT_HEIGHT: u32 = 512;

/// Maximum length of a job name.
pub const MAX_NAME_LEN: usize = 128;

/// Sampling parameters shared by every job in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub steps: u32,
    pub cfg: f64,
    pub guidance: f64,
    pub sampler_name: String,
    pub scheduler: String,
    pub denoise: f64,
    pub width: u32,
    pub height: u32,
    pub unet_name: String,
    pub clip_name1: String,
    pub clip_name2: String,
    pub vae_name: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            cfg: DEFAULT_CFG,
            guidance: DEFAULT_GUIDANCE,
            sampler_name: "euler".to_string(),
            scheduler: "simple".to_string(),
            denoise: 1.0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            unet_name: "flux1-schnell-Q4_K_S.gguf".to_string(),
            clip_name1: "clip_l.safetensors".to_string(),
            clip_name2: "t5-v1_1-xxl-encoder-Q4_K_M.gguf".to_string(),
            vae_name: "ae.safetensors".to_string(),
        }
    }
}

/// One named generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Unique within a batch; used as the output filename prefix.
    pub name: String,
    pub seed: u64,
    /// Short CLIP-L prompt.
    pub clip_prompt: String,
    /// Long-form T5-XXL prompt.
    pub t5_prompt: String,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

impl JobDescriptor {
    /// Create a descriptor with the default [`SamplingConfig`].
    pub fn new(
        name: impl Into<String>,
        seed: u64,
        clip_prompt: impl Into<String>,
        t5_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            seed,
            clip_prompt: clip_prompt.into(),
            t5_prompt: t5_prompt.into(),
            sampling: SamplingConfig::default(),
        }
    }

    /// Check the local preconditions for building a job graph.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_name(&self.name)?;

        if self.clip_prompt.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "{}: clip_prompt must not be empty",
                self.name
            )));
        }
        if self.t5_prompt.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "{}: t5_prompt must not be empty",
                self.name
            )));
        }
        if self.sampling.steps == 0 {
            return Err(CoreError::Validation(format!(
                "{}: steps must be at least 1",
                self.name
            )));
        }
        if self.sampling.width == 0 || self.sampling.height == 0 {
            return Err(CoreError::Validation(format!(
                "{}: latent dimensions must be non-zero (got {}x{})",
                self.name, self.sampling.width, self.sampling.height
            )));
        }

        Ok(())
    }
}

/// Validate a job name: non-empty, at most [`MAX_NAME_LEN`] characters,
/// ASCII alphanumerics plus `-`, `_` and `.`, and not starting with `.`.
pub fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation("Job name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Job name '{name}' exceeds {MAX_NAME_LEN} characters"
        )));
    }
    if name.starts_with('.') {
        return Err(CoreError::Validation(format!(
            "Job name '{name}' must not start with '.'"
        )));
    }
    let safe = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !safe {
        return Err(CoreError::Validation(format!(
            "Job name '{name}' may only contain letters, digits, '-', '_' and '.'"
        )));
    }
    Ok(())
}

/// Tracks names already seen in a batch run.
#[derive(Debug, Default)]
pub struct NameRegistry {
    seen: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name`, failing if it was already claimed by an earlier item.
    pub fn claim(&mut self, name: &str) -> Result<(), CoreError> {
        if self.seen.insert(name.to_string()) {
            Ok(())
        } else {
            Err(CoreError::DuplicateName(name.to_string()))
        }
    }
}
