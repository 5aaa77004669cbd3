//! Runner configuration.

use std::path::PathBuf;

use vigil_engine::EngineConfig;

use crate::error::{RunnerError, RunnerResult};

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Detection logs to replay, one source each
    pub inputs: Vec<PathBuf>,
    /// Alert log, appended to as JSON lines
    pub alerts_path: PathBuf,
    /// Where to write accumulated training features (enables accumulation)
    pub features_path: Option<PathBuf>,
    /// JSON engine configuration; `VIGIL_*` variables are used when unset
    pub engine_config_path: Option<PathBuf>,
    /// Maximum sources replayed at once
    pub max_concurrent_sources: usize,
    /// Frames buffered between a source's reader and its engine
    pub frame_channel_capacity: usize,
    /// Alert rows buffered ahead of the sink writer
    pub alert_channel_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            alerts_path: PathBuf::from("outputs/alerts/log.jsonl"),
            features_path: None,
            engine_config_path: None,
            max_concurrent_sources: 4,
            frame_channel_capacity: 64,
            alert_channel_capacity: 256,
        }
    }
}

impl RunnerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            inputs: std::env::var("VIGIL_INPUTS")
                .map(|s| split_paths(&s))
                .unwrap_or_default(),
            alerts_path: std::env::var("VIGIL_ALERTS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.alerts_path),
            features_path: std::env::var("VIGIL_FEATURES_PATH").ok().map(PathBuf::from),
            engine_config_path: std::env::var("VIGIL_ENGINE_CONFIG").ok().map(PathBuf::from),
            max_concurrent_sources: std::env::var("VIGIL_MAX_SOURCES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_sources),
            frame_channel_capacity: std::env::var("VIGIL_FRAME_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_channel_capacity),
            alert_channel_capacity: std::env::var("VIGIL_ALERT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.alert_channel_capacity),
        }
    }

    /// Positional arguments replace `VIGIL_INPUTS`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathBuf>,
    {
        let inputs: Vec<PathBuf> = args.into_iter().map(Into::into).collect();
        if !inputs.is_empty() {
            self.inputs = inputs;
        }
        self
    }

    pub fn validate(&self) -> RunnerResult<()> {
        if self.inputs.is_empty() {
            return Err(RunnerError::config_error(
                "no inputs given (pass detection logs as arguments or set VIGIL_INPUTS)",
            ));
        }
        if self.max_concurrent_sources == 0 {
            return Err(RunnerError::config_error("VIGIL_MAX_SOURCES must be > 0"));
        }
        if self.frame_channel_capacity == 0 || self.alert_channel_capacity == 0 {
            return Err(RunnerError::config_error("channel capacities must be > 0"));
        }
        Ok(())
    }

    /// Resolve the engine configuration: JSON file if given, else environment.
    ///
    /// A features path turns accumulation on.
    pub fn engine_config(&self) -> RunnerResult<EngineConfig> {
        let mut config = match &self.engine_config_path {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::from_env(),
        };
        if self.features_path.is_some() {
            config.novelty.accumulate = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn split_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_paths() {
        assert_eq!(
            split_paths(" a.jsonl, ,b/c.jsonl,"),
            vec![PathBuf::from("a.jsonl"), PathBuf::from("b/c.jsonl")]
        );
    }

    #[test]
    fn test_args_override_inputs() {
        let config = RunnerConfig {
            inputs: vec![PathBuf::from("env.jsonl")],
            ..RunnerConfig::default()
        };
        let config = config.with_args(["cam1.jsonl", "cam2.jsonl"]);
        assert_eq!(config.inputs.len(), 2);

        let config = config.with_args(Vec::<String>::new());
        assert_eq!(config.inputs.len(), 2);
    }

    #[test]
    fn test_validate_requires_inputs() {
        assert!(RunnerConfig::default().validate().is_err());
        let config = RunnerConfig::default().with_args(["cam1.jsonl"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_features_path_enables_accumulation() {
        let dir = tempfile::tempdir().unwrap();
        let engine_path = dir.path().join("engine.json");
        std::fs::write(&engine_path, r#"{"fps": 25.0}"#).unwrap();

        let config = RunnerConfig {
            engine_config_path: Some(engine_path),
            features_path: Some(dir.path().join("features.json.gz")),
            ..RunnerConfig::default()
        };
        let engine = config.engine_config().unwrap();
        assert_eq!(engine.fps, 25.0);
        assert!(engine.novelty.accumulate);
    }
}
