//! Demo configuration structures and loaders.
use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use interaction_core::{DetectionMode, InteractionConfig};
use interaction_runtime::RuntimeConfig;

/// Configuration required to run the scripted demo.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    pub runtime: RuntimeConfig,
    /// How long the scenario keeps printing events before shutting down.
    pub duration: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            duration: Duration::from_secs(6),
        }
    }
}

impl DemoConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `INTERACTION_CONFIG` - Path to a JSON `InteractionConfig` (applied first)
    /// - `INTERACTION_TICK_HZ` - Simulation ticks per second (default: 30)
    /// - `INTERACTION_RANGE` - Interaction range override
    /// - `INTERACTION_DETECTION` - `radius`, `ray` or `ray-multi`
    /// - `DEMO_DURATION_SECS` - Scenario length in seconds (default: 6)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`DemoConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("INTERACTION_CONFIG") {
            config.runtime.interaction = load_interaction_config(Path::new(&path))?;
        }

        if let Some(hz) = read_var::<f32>(&lookup, "INTERACTION_TICK_HZ")? {
            config.runtime.tick_rate_hz = hz;
        }

        if let Some(range) = read_var::<f32>(&lookup, "INTERACTION_RANGE")? {
            config.runtime.interaction.range = range;
        }

        if let Some(mode) = lookup("INTERACTION_DETECTION") {
            config.runtime.interaction.detection = parse_detection(&mode)?;
        }

        if let Some(secs) = read_var::<f32>(&lookup, "DEMO_DURATION_SECS")? {
            config.duration = Duration::try_from_secs_f32(secs)
                .with_context(|| format!("DEMO_DURATION_SECS must be a non-negative number (got {secs})"))?;
        }

        config
            .runtime
            .validate()
            .context("invalid runtime configuration")?;
        Ok(config)
    }
}

/// Reads an `InteractionConfig` JSON file; missing fields keep their defaults.
pub fn load_interaction_config(path: &Path) -> Result<InteractionConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read interaction config {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse interaction config {}", path.display()))
}

pub fn parse_detection(value: &str) -> Result<DetectionMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "radius" => Ok(DetectionMode::Radius),
        "ray" => Ok(DetectionMode::Ray { multi_hit: false }),
        "ray-multi" => Ok(DetectionMode::Ray { multi_hit: true }),
        other => bail!("unknown detection mode `{other}` (expected radius, ray or ray-multi)"),
    }
}

fn read_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid value for {key}: `{raw}`"))
        })
        .transpose()
}
