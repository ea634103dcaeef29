use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use occugrid_mapping::MappingTaskConfig;
use serde::Deserialize;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Grid shape and the robot's starting cell.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub width: usize,
    pub height: usize,
    pub start_x: i64,
    pub start_y: i64,
}

impl Default for GridSettings {
    fn default() -> Self {
        GridSettings {
            width: 40,
            height: 30,
            start_x: 20,
            start_y: 15,
        }
    }
}

/// Simulated range sensor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// Beams per sweep, evenly spread over 360°.
    pub beams: usize,
    /// Returns farther than this are not reported.
    pub max_range: f64,
    /// Standard deviation of the range noise, in cells.
    pub noise_std: f64,
    pub rate_hz: f64,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SensorSettings {
    fn default() -> Self {
        SensorSettings {
            beams: 180,
            max_range: 30.0,
            noise_std: 0.15,
            rate_hz: 20.0,
            seed: None,
        }
    }
}

/// Rectangular room the simulated robot drives in, in grid units.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomSettings {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for RoomSettings {
    fn default() -> Self {
        RoomSettings {
            min_x: 2.0,
            min_y: 2.0,
            max_x: 37.0,
            max_y: 27.0,
        }
    }
}

/// Constant velocity of the simulated base, in cells per sweep.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    pub vx: f64,
    pub vy: f64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        MotionSettings { vx: 0.4, vy: 0.25 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Map export path; empty disables exports.
    pub path: String,
    pub record_interval_ms: u64,
    /// Sweeps to map before stopping; 0 runs until the sensor stops.
    pub sweeps: u64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            path: "map.txt".to_string(),
            record_interval_ms: 1000,
            sweeps: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid: GridSettings,
    pub sensor: SensorSettings,
    pub room: RoomSettings,
    pub motion: MotionSettings,
    pub output: OutputSettings,
}

impl Settings {
    pub fn task_config(&self) -> MappingTaskConfig {
        MappingTaskConfig {
            record_path: (!self.output.path.is_empty()).then(|| PathBuf::from(&self.output.path)),
            record_interval: Duration::from_millis(self.output.record_interval_ms),
            max_sweeps: (self.output.sweeps > 0).then_some(self.output.sweeps),
        }
    }

    /// Time between sweeps. Only meaningful once [`Settings::validate`] passed.
    pub fn sweep_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.sensor.rate_hz).unwrap_or(Duration::MAX)
    }

    /// Rejects sensor settings the driver cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sensor = &self.sensor;
        if !(sensor.rate_hz.is_finite() && sensor.rate_hz > 0.0) {
            return Err(ConfigError::Message(format!(
                "sensor.rate_hz must be finite and positive, got {}",
                sensor.rate_hz
            )));
        }
        // Periods shorter than a nanosecond round to zero
        if Duration::try_from_secs_f64(1.0 / sensor.rate_hz).map_or(true, |p| p.is_zero()) {
            return Err(ConfigError::Message(format!(
                "sensor.rate_hz {} is out of range",
                sensor.rate_hz
            )));
        }
        if sensor.beams == 0 {
            return Err(ConfigError::Message("sensor.beams must be non-zero".to_string()));
        }
        if !(sensor.max_range.is_finite() && sensor.max_range > 0.0) {
            return Err(ConfigError::Message(format!(
                "sensor.max_range must be finite and positive, got {}",
                sensor.max_range
            )));
        }
        if !(sensor.noise_std.is_finite() && sensor.noise_std >= 0.0) {
            return Err(ConfigError::Message(format!(
                "sensor.noise_std must be finite and non-negative, got {}",
                sensor.noise_std
            )));
        }
        Ok(())
    }
}

/// Loads settings from `config/default.toml` (if present), then `path` (if
/// given, required), then `OCCUGRID__SECTION__KEY` environment variables.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let mut builder = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(false));
    if let Some(path) = path {
        info!("Layering configuration from {}", path.display());
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }
    let settings = builder
        .add_source(
            Environment::with_prefix("OCCUGRID")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|config| config.try_deserialize::<Settings>())
        .and_then(|settings| settings.validate().map(|()| settings));

    match settings {
        Ok(settings) => {
            info!("Successfully loaded configuration: {:?}", settings);
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.grid.width, 40);
        assert_eq!(settings.grid.height, 30);
        let task = settings.task_config();
        assert_eq!(task.record_path, Some(PathBuf::from("map.txt")));
        assert_eq!(task.record_interval, Duration::from_secs(1));
        assert_eq!(task.max_sweeps, Some(100));
        assert!((settings.sweep_period().as_secs_f64() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.toml");
        std::fs::write(
            &path,
            "[grid]\nwidth = 12\nheight = 8\n\n[output]\npath = \"\"\nsweeps = 0\n",
        )
        .unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.grid.width, 12);
        assert_eq!(settings.grid.height, 8);
        // Unset keys keep their defaults
        assert_eq!(settings.grid.start_x, 20);
        assert_eq!(settings.sensor.beams, 180);

        let task = settings.task_config();
        assert_eq!(task.record_path, None);
        assert_eq!(task.max_sweeps, None);
    }

    #[test]
    fn test_rejects_zero_rate() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.toml");
        std::fs::write(&path, "[sensor]\nrate_hz = 0.0\n").unwrap();

        match load_settings(Some(&path)) {
            Err(ConfigError::Message(msg)) => assert!(msg.contains("rate_hz")),
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_sensor_settings() {
        assert!(Settings::default().validate().is_ok());

        let mut settings = Settings::default();
        settings.sensor.rate_hz = 1e-20;
        assert!(settings.validate().is_err());
        settings.sensor.rate_hz = 1e12;
        assert!(settings.validate().is_err());
        settings.sensor.rate_hz = f64::NAN;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.sensor.beams = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.sensor.max_range = -1.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.sensor.noise_std = -0.1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        assert!(load_settings(Some(&path)).is_err());
    }
}
