use serde::{Deserialize, Serialize};

/// Configuration for signature generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sample rate of the input PCM stream. The DSP path supports 16000 Hz
    /// only; other rates exist solely in the container header enum.
    pub sample_rate: u32,

    /// Maximum duration of one signature chunk (in seconds)
    pub max_time_seconds: f32,

    /// Maximum number of peaks accumulated into one signature chunk
    pub max_peaks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            max_time_seconds: 3.1,
            max_peaks: 255,
        }
    }
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the maximum chunk duration
    pub fn with_max_time_seconds(mut self, max_time_seconds: f32) -> Self {
        self.max_time_seconds = max_time_seconds;
        self
    }

    /// Set the maximum number of peaks per chunk
    pub fn with_max_peaks(mut self, max_peaks: usize) -> Self {
        self.max_peaks = max_peaks;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
