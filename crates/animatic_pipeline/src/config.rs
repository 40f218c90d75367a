//! Pipeline configuration.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Bundled defaults (include_str! from animatic.toml)
//! - User config in the home directory (~/.config/animatic/animatic.toml)
//! - User config in the current directory (./animatic.toml)
//! - `ANIMATIC__<SECTION>__<KEY>` environment variables

use animatic_core::RenderOptions;
use animatic_error::{AnimaticError, AnimaticResult, ConfigError, GENERIC_FAILURE_MESSAGE};
use animatic_render::SandboxConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};

/// Retry budgets for the fix and render loops.
///
/// # Example
///
/// ```toml
/// [loops]
/// max_script_fix_attempts = 3
/// max_render_attempts = 3
/// attempt_history_limit = 3
/// max_regeneration_calls = 3
/// regeneration_retry_delay_ms = 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Repair requests the fix loop may make
    pub max_script_fix_attempts: u32,
    /// Renders per job
    pub max_render_attempts: u32,
    /// Failed attempts replayed to the generator
    pub attempt_history_limit: usize,
    /// Regeneration calls per failed render, including the first
    pub max_regeneration_calls: u32,
    /// Pause between empty regeneration results
    pub regeneration_retry_delay_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_script_fix_attempts: 3,
            max_render_attempts: 3,
            attempt_history_limit: 3,
            max_regeneration_calls: 3,
            regeneration_retry_delay_ms: 250,
        }
    }
}

impl LoopConfig {
    /// Pause between empty regeneration results.
    pub fn regeneration_retry_delay(&self) -> Duration {
        Duration::from_millis(self.regeneration_retry_delay_ms)
    }
}

/// Progress delivery settings.
///
/// # Example
///
/// ```toml
/// [progress]
/// drain_timeout_ms = 2000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// How long a finished job waits for queued progress updates
    pub drain_timeout_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            drain_timeout_ms: 2000,
        }
    }
}

impl ProgressConfig {
    /// How long a finished job waits for queued progress updates.
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Where finished videos land locally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Local artifact directory
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("renders"),
        }
    }
}

/// User-facing text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Status persisted for failed jobs
    pub generic_failure: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            generic_failure: GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Top-level animatic configuration.
///
/// # Example
///
/// ```no_run
/// use animatic_pipeline::PipelineConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::load()?;
/// println!("render attempts: {}", config.loops.max_render_attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Retry budgets
    #[serde(default)]
    pub loops: LoopConfig,
    /// Render quality, validation bounds and post-processing
    #[serde(default)]
    pub render: RenderOptions,
    /// Sandbox location, timeouts and binaries
    #[serde(default)]
    pub sandbox: SandboxConfig,
    /// Progress delivery
    #[serde(default)]
    pub progress: ProgressConfig,
    /// Local artifact directory
    #[serde(default)]
    pub output: OutputConfig,
    /// User-facing text
    #[serde(default)]
    pub messages: MessagesConfig,
}

impl PipelineConfig {
    /// Load configuration from a specific file path.
    ///
    /// Missing sections fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> AnimaticResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                AnimaticError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                AnimaticError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the merged values are invalid.
    #[instrument]
    pub fn load() -> AnimaticResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../../../animatic.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/animatic/animatic.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("animatic").required(false))
            .add_source(
                Environment::with_prefix("ANIMATIC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .map_err(|e| {
                AnimaticError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                AnimaticError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check that every budget allows at least one attempt and the
    /// duration bounds make sense.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first offending value.
    pub fn validate(&self) -> AnimaticResult<()> {
        let budgets = [
            ("loops.max_script_fix_attempts", self.loops.max_script_fix_attempts as u64),
            ("loops.max_render_attempts", self.loops.max_render_attempts as u64),
            ("loops.attempt_history_limit", self.loops.attempt_history_limit as u64),
            ("loops.max_regeneration_calls", self.loops.max_regeneration_calls as u64),
            ("sandbox.command_timeout_secs", *self.sandbox.command_timeout_secs()),
            ("sandbox.render_timeout_secs", *self.sandbox.render_timeout_secs()),
        ];
        for (name, value) in budgets {
            if value < 1 {
                return Err(ConfigError::new(format!("{} must be at least 1", name)).into());
            }
        }

        let min = *self.render.min_duration_secs();
        let max = *self.render.max_duration_secs();
        if !(min >= 0.0 && max > min) {
            return Err(ConfigError::new(format!(
                "render duration bounds are invalid: min {} max {}",
                min, max
            ))
            .into());
        }

        if let Some(speed) = self.render.speed()
            && !(speed.is_finite() && *speed > 0.0)
        {
            return Err(ConfigError::new(format!("render.speed must be positive, got {}", speed)).into());
        }

        Ok(())
    }

    /// Render options with the configured output directory applied.
    pub fn render_options(&self) -> RenderOptions {
        self.render.clone().with_output_dir(self.output.dir.clone())
    }
}
