//! Worker configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use inkseal_comfyui::poller::PollConfig;
use inkseal_pipeline::batch::BatchConfig;
use inkseal_pipeline::materialize::ResizeCapability;

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration for one batch run.
///
/// All fields have defaults suitable for a local ComfyUI install.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base HTTP URL of the ComfyUI server.
    pub comfyui_url: String,
    /// Directory ComfyUI writes generated images into.
    pub output_dir: PathBuf,
    /// Directories that each receive a copy of every generated image.
    pub destination_dirs: Vec<PathBuf>,
    /// Prefix for destination filenames.
    pub file_prefix: String,
    pub target_width: u32,
    pub target_height: u32,
    pub job_timeout: Duration,
    pub poll_interval: Duration,
    /// JSON descriptor list replacing the built-in set.
    pub batch_file: Option<PathBuf>,
    /// Where to write the JSON run report, if anywhere.
    pub report_file: Option<PathBuf>,
    /// Skip decoding and copy artifacts byte for byte.
    pub force_copy: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                                |
    /// |----------------------|----------------------------------------|
    /// | `COMFYUI_URL`        | `http://127.0.0.1:8188`                |
    /// | `COMFYUI_OUTPUT_DIR` | `./ComfyUI/output`                     |
    /// | `DESTINATION_DIRS`   | `./out/daily-idiom,./out/app-logos`    |
    /// | `OUTPUT_FILE_PREFIX` | `daily-idiom-`                         |
    /// | `TARGET_WIDTH`       | `600`                                  |
    /// | `TARGET_HEIGHT`      | `600`                                  |
    /// | `JOB_TIMEOUT_SECS`   | `300`                                  |
    /// | `POLL_INTERVAL_SECS` | `3`                                    |
    /// | `BATCH_FILE`         | unset (built-in descriptors)           |
    /// | `REPORT_FILE`        | unset                                  |
    /// | `FORCE_COPY`         | `false`                                |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let optional_path = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };

        let destination_dirs: Vec<PathBuf> = get("DESTINATION_DIRS", "./out/daily-idiom,./out/app-logos")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
        if destination_dirs.is_empty() {
            return Err(ConfigError::Invalid {
                var: "DESTINATION_DIRS",
                value: lookup("DESTINATION_DIRS").unwrap_or_default(),
                reason: "at least one directory is required".to_string(),
            });
        }

        let target_width = parse_positive("TARGET_WIDTH", &get("TARGET_WIDTH", "600"))?;
        let target_height = parse_positive("TARGET_HEIGHT", &get("TARGET_HEIGHT", "600"))?;
        let job_timeout_secs = parse_positive("JOB_TIMEOUT_SECS", &get("JOB_TIMEOUT_SECS", "300"))?;
        let poll_interval_secs: u64 = parse("POLL_INTERVAL_SECS", &get("POLL_INTERVAL_SECS", "3"))?;
        let force_copy = parse_bool("FORCE_COPY", &get("FORCE_COPY", "false"))?;

        Ok(Self {
            comfyui_url: get("COMFYUI_URL", "http://127.0.0.1:8188"),
            output_dir: PathBuf::from(get("COMFYUI_OUTPUT_DIR", "./ComfyUI/output")),
            destination_dirs,
            file_prefix: lookup("OUTPUT_FILE_PREFIX").unwrap_or_else(|| "daily-idiom-".to_string()),
            target_width,
            target_height,
            job_timeout: Duration::from_secs(u64::from(job_timeout_secs)),
            poll_interval: Duration::from_secs(poll_interval_secs),
            batch_file: optional_path("BATCH_FILE"),
            report_file: optional_path("REPORT_FILE"),
            force_copy,
        })
    }

    /// The coordinator view of this configuration.
    pub fn batch_config(&self) -> BatchConfig {
        let mut config = BatchConfig::new(self.output_dir.clone(), self.destination_dirs.clone());
        config.file_prefix = self.file_prefix.clone();
        config.target_width = self.target_width;
        config.target_height = self.target_height;
        config.poll = PollConfig {
            interval: self.poll_interval,
            timeout: self.job_timeout,
        };
        config.resize = if self.force_copy {
            ResizeCapability::Unavailable
        } else {
            ResizeCapability::detect()
        };
        config
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_positive(var: &'static str, value: &str) -> Result<u32, ConfigError> {
    let n: u32 = parse(var, value)?;
    if n == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(n)
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.comfyui_url, "http://127.0.0.1:8188");
        assert_eq!(config.destination_dirs.len(), 2);
        assert_eq!(config.file_prefix, "daily-idiom-");
        assert_eq!(config.job_timeout, Duration::from_secs(300));
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!((config.target_width, config.target_height), (600, 600));
        assert!(config.batch_file.is_none());
        assert!(!config.force_copy);
    }

    #[test]
    fn destination_list_is_trimmed() {
        let config = load(&[("DESTINATION_DIRS", " /a , ,/b ")]).unwrap();
        assert_eq!(
            config.destination_dirs,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let err = load(&[("JOB_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().starts_with("JOB_TIMEOUT_SECS"));
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(load(&[("JOB_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn zero_poll_interval_allowed() {
        let config = load(&[("POLL_INTERVAL_SECS", "0")]).unwrap();
        assert_eq!(config.poll_interval, Duration::ZERO);
    }

    #[test]
    fn empty_prefix_is_respected() {
        let config = load(&[("OUTPUT_FILE_PREFIX", "")]).unwrap();
        assert_eq!(config.file_prefix, "");
    }

    #[test]
    fn force_copy_disables_resize() {
        let config = load(&[("FORCE_COPY", "yes")]).unwrap();
        assert_eq!(config.batch_config().resize, ResizeCapability::Unavailable);
    }

    #[test]
    fn batch_config_carries_timing_and_paths() {
        let config = load(&[
            ("COMFYUI_OUTPUT_DIR", "/srv/comfy/output"),
            ("POLL_INTERVAL_SECS", "1"),
            ("JOB_TIMEOUT_SECS", "30"),
        ])
        .unwrap();
        let batch = config.batch_config();
        assert_eq!(batch.output_root, PathBuf::from("/srv/comfy/output"));
        assert_eq!(batch.poll.interval, Duration::from_secs(1));
        assert_eq!(batch.poll.timeout, Duration::from_secs(30));
        assert_eq!(batch.file_prefix, "daily-idiom-");
    }
}
