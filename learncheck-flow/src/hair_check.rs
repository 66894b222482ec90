//! Hair-check device gate.
//!
//! Gates entry into a remote session on local device readiness. Probing is
//! purely local; a failed check never contacts the remote API and is never
//! stored on the orchestrator.

use std::path::{Path, PathBuf};
use thiserror::Error;

use learncheck_core::config::schema::DevicesConfig;

/// Local media device errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Device permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Device unavailable: {0}")]
    Unavailable(String),
}

/// A detected local capture device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device node or driver-reported name
    pub name: String,
}

/// Outcome of probing both capture devices
#[derive(Debug, Clone)]
pub struct DeviceReport {
    pub camera: Result<DeviceInfo, DeviceError>,
    pub microphone: Result<DeviceInfo, DeviceError>,
}

/// Trait for local media capability probing.
///
/// An embedding UI supplies its own implementation; the default
/// [`SystemMediaProbe`] scans device nodes on the local filesystem.
pub trait MediaProbe: Send + Sync {
    /// Probe for a usable video capture device
    fn probe_camera(&self) -> Result<DeviceInfo, DeviceError>;

    /// Probe for a usable audio capture device
    fn probe_microphone(&self) -> Result<DeviceInfo, DeviceError>;
}

/// Filesystem-based media probe.
///
/// Looks for V4L capture nodes (`video*`) and ALSA capture nodes
/// (`pcmC*c`). Directories are injectable so tests can point at a
/// temporary tree.
pub struct SystemMediaProbe {
    video_dir: PathBuf,
    audio_dir: PathBuf,
}

impl SystemMediaProbe {
    /// Create a probe from the devices configuration
    pub fn from_config(config: &DevicesConfig) -> Self {
        Self {
            video_dir: PathBuf::from(&config.video_device_dir),
            audio_dir: PathBuf::from(&config.audio_device_dir),
        }
    }

    /// Create a probe with explicit device directories
    pub fn with_dirs<P: AsRef<Path>, Q: AsRef<Path>>(video_dir: P, audio_dir: Q) -> Self {
        Self {
            video_dir: video_dir.as_ref().to_path_buf(),
            audio_dir: audio_dir.as_ref().to_path_buf(),
        }
    }

    fn scan(dir: &Path, matches: impl Fn(&str) -> bool, what: &str) -> Result<DeviceInfo, DeviceError> {
        let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => DeviceError::PermissionDenied(e.to_string()),
            std::io::ErrorKind::NotFound => {
                DeviceError::NotFound(format!("no {} device directory at {}", what, dir.display()))
            }
            _ => DeviceError::Unavailable(e.to_string()),
        })?;

        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
            .filter(|name| matches(name))
            .collect();
        names.sort();

        names
            .into_iter()
            .next()
            .map(|name| DeviceInfo { name })
            .ok_or_else(|| {
                DeviceError::NotFound(format!("no {} device under {}", what, dir.display()))
            })
    }
}

impl MediaProbe for SystemMediaProbe {
    fn probe_camera(&self) -> Result<DeviceInfo, DeviceError> {
        Self::scan(
            &self.video_dir,
            |name| name.starts_with("video") && name["video".len()..].chars().all(|c| c.is_ascii_digit()),
            "camera",
        )
    }

    fn probe_microphone(&self) -> Result<DeviceInfo, DeviceError> {
        // ALSA capture nodes are pcmC<card>D<dev>c
        Self::scan(
            &self.audio_dir,
            |name| name.starts_with("pcmC") && name.ends_with('c'),
            "microphone",
        )
    }
}

/// The hair-check screen: runs the probes and applies the configured
/// requirements before a join is allowed through.
pub struct HairCheckScreen {
    probe: Box<dyn MediaProbe>,
    require_camera: bool,
    require_microphone: bool,
}

impl HairCheckScreen {
    /// Create a screen over the given probe and devices configuration
    pub fn new(probe: Box<dyn MediaProbe>, config: &DevicesConfig) -> Self {
        Self {
            probe,
            require_camera: config.require_camera,
            require_microphone: config.require_microphone,
        }
    }

    /// Probe both devices and return the raw report
    pub fn report(&self) -> DeviceReport {
        DeviceReport {
            camera: self.probe.probe_camera(),
            microphone: self.probe.probe_microphone(),
        }
    }

    /// Check that every required device is obtainable.
    ///
    /// Returns the first blocking failure; devices not required by the
    /// configuration may fail without blocking the join.
    pub fn ensure_ready(&self) -> Result<DeviceReport, DeviceError> {
        let report = self.report();
        if self.require_camera {
            if let Err(err) = &report.camera {
                return Err(err.clone());
            }
        }
        if self.require_microphone {
            if let Err(err) = &report.microphone {
                return Err(err.clone());
            }
        }
        Ok(report)
    }
}
