//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for learncheck
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Conversation session API configuration
    #[serde(default)]
    pub session: SessionApiConfig,
    /// Local media device requirements
    #[serde(default)]
    pub devices: DevicesConfig,
    /// Learning-check defaults
    #[serde(default)]
    pub learning_check: LearningCheckConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Conversation session API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionApiConfig {
    /// Base URL of the conversation-session endpoint
    #[serde(default = "default_session_base_url")]
    pub base_url: String,
    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: String,
    /// Default persona used when a request does not carry one
    #[serde(default)]
    pub persona_id: String,
}

fn default_session_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

impl Default for SessionApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_session_base_url(),
            api_key: String::new(),
            persona_id: String::new(),
        }
    }
}

/// Local media device requirements for the hair-check gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesConfig {
    /// Require a camera before joining
    #[serde(default = "default_true")]
    pub require_camera: bool,
    /// Require a microphone before joining
    #[serde(default = "default_true")]
    pub require_microphone: bool,
    /// Directory scanned for video capture devices
    #[serde(default = "default_video_device_dir")]
    pub video_device_dir: String,
    /// Directory scanned for audio capture devices
    #[serde(default = "default_audio_device_dir")]
    pub audio_device_dir: String,
}

fn default_true() -> bool {
    true
}

fn default_video_device_dir() -> String {
    "/dev".to_string()
}

fn default_audio_device_dir() -> String {
    "/dev/snd".to_string()
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            require_camera: default_true(),
            require_microphone: default_true(),
            video_device_dir: default_video_device_dir(),
            audio_device_dir: default_audio_device_dir(),
        }
    }
}

/// Learning-check defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningCheckConfig {
    /// Default session time limit in seconds
    #[serde(default = "default_time_limit_secs")]
    pub default_time_limit_secs: u32,
}

fn default_time_limit_secs() -> u32 {
    180
}

impl Default for LearningCheckConfig {
    fn default() -> Self {
        Self {
            default_time_limit_secs: default_time_limit_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
