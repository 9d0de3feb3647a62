//! JSON run configuration for the benchmark runner.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use ks_solver::{PatternConfig, ScheduleConfig, SimplexConfig, StopCondition};
use ks_types::{config_error, validation_error, KsResult};

use crate::benchmarks::Benchmark;

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "KESTREL_CONFIG";

/// Strategies a session can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Random,
    Pattern,
    Simplex,
}

/// One benchmark session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Label used in logs and the report; defaults to the benchmark name.
    pub name: Option<String>,
    pub benchmark: Benchmark,
    pub dimensions: usize,
    /// Seeds the turn lottery and the random strategy.
    pub seed: u64,
    pub strategies: Vec<StrategyKind>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: None,
            benchmark: Benchmark::Sphere,
            dimensions: 2,
            seed: 0,
            strategies: vec![
                StrategyKind::Random,
                StrategyKind::Pattern,
                StrategyKind::Simplex,
            ],
        }
    }
}

impl SessionConfig {
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}-{}d-seed{}", self.benchmark, self.dimensions, self.seed))
    }
}

/// Top-level configuration of `kestrel-bench`. Every field has a default,
/// so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stop: StopCondition,
    pub schedule: ScheduleConfig,
    pub pattern: PatternConfig,
    pub simplex: SimplexConfig,
    /// Run sessions on the rayon pool instead of one after another.
    pub parallel: bool,
    pub sessions: Vec<SessionConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stop: StopCondition::max_evaluations(1000),
            schedule: ScheduleConfig::default(),
            pattern: PatternConfig::default(),
            simplex: SimplexConfig::default(),
            parallel: true,
            sessions: vec![SessionConfig::default()],
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> KsResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> KsResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        info!(
            "Loaded {} sessions from {}",
            config.sessions.len(),
            path.display()
        );
        Ok(config)
    }

    /// Load from `path`, else from `$KESTREL_CONFIG`, else the defaults.
    pub fn load(path: Option<&str>) -> KsResult<Self> {
        let from_env = std::env::var(CONFIG_ENV).ok();
        match path.or(from_env.as_deref()) {
            Some(path) => Self::from_file(path),
            None => {
                info!("No configuration given, using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> KsResult<()> {
        self.stop
            .validate()
            .map_err(|message| config_error!("stop condition: {message}"))?;
        self.schedule.validate()?;
        self.pattern.validate()?;
        self.simplex.validate()?;
        if self.sessions.is_empty() {
            return Err(config_error!("at least one session is required"));
        }
        for session in &self.sessions {
            if session.dimensions == 0 {
                return Err(validation_error!("session {} has no dimensions", session.label()));
            }
            if session.strategies.is_empty() {
                return Err(validation_error!("session {} has no strategies", session.label()));
            }
            if self.stop.uses_satisfaction() {
                let problem = session.benchmark.problem(session.dimensions)?;
                if let Some(objective) =
                    problem.objectives().iter().find(|o| o.satisfaction.is_none())
                {
                    return Err(validation_error!(
                        "session {}: stop condition uses satisfaction but objective {} has no satisfaction curve",
                        session.label(),
                        objective.name
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_types::KsError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_object_is_the_default() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{
                "stop": {"max_evaluations": 250},
                "parallel": false,
                "schedule": {"seed": 5},
                "sessions": [
                    {"benchmark": "rosenbrock", "dimensions": 3, "strategies": ["simplex"]},
                    {"name": "tiny", "benchmark": "shifted_parabola", "dimensions": 1}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.stop, StopCondition::max_evaluations(250));
        assert!(!config.parallel);
        assert_eq!(config.schedule.seed, 5);
        assert_eq!(config.schedule.max_wait_turns, 16);
        assert_eq!(config.sessions[0].strategies, vec![StrategyKind::Simplex]);
        assert_eq!(config.sessions[0].label(), "rosenbrock-3d-seed0");
        assert_eq!(config.sessions[1].label(), "tiny");
        assert_eq!(config.sessions[1].strategies.len(), 3);
    }

    #[test]
    fn invalid_values_fail_fast() {
        let err = EngineConfig::from_json(r#"{"sessions": []}"#).unwrap_err();
        assert!(matches!(err, KsError::Config(_)));
        assert!(EngineConfig::from_json(r#"{"schedule": {"rating_decay": 2.0}}"#).is_err());
        assert!(matches!(
            EngineConfig::from_json(r#"{"sessions": [{"dimensions": 0}]}"#),
            Err(KsError::Validation(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"sessions": [{"strategies": []}]}"#),
            Err(KsError::Validation(_))
        ));
        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(KsError::Serialization(_))
        ));
    }

    #[test]
    fn satisfaction_stops_need_curved_benchmarks() {
        for stop in [
            r#"{"satisfaction": {"threshold": 0.9}}"#,
            r#"{"min_max_time": {"min_seconds": 0.0, "max_seconds": 2.0, "threshold": 0.9}}"#,
            r#"{"all": [{"max_evaluations": 10}, {"satisfaction": {"threshold": 0.9}}]}"#,
        ] {
            let json = format!(r#"{{"stop": {stop}}}"#);
            let err = EngineConfig::from_json(&json).unwrap_err();
            assert!(matches!(err, KsError::Validation(_)), "{stop}: {err}");
        }
        let json = r#"{"stop": {"any": [{"max_evaluations": 10}, {"max_elapsed": {"seconds": 1.0}}]}}"#;
        assert!(EngineConfig::from_json(json).is_ok());
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"sessions": [{{"benchmark": "rastrigin", "seed": 3}}]}}"#).unwrap();

        let config = EngineConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.sessions[0].benchmark, Benchmark::Rastrigin);
        assert_eq!(config.sessions[0].seed, 3);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let err = EngineConfig::from_file(&missing).unwrap_err();
        assert!(matches!(err, KsError::Io(_)));
    }
}
