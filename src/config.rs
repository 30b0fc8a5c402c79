use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides transcoder discovery
pub const FFMPEG_ENV: &str = "NARRATION_FFMPEG";

/// Settings shared by analysis and export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Transcoder executable
    pub ffmpeg_path: PathBuf,
    /// Directory for intermediate files
    pub work_dir: PathBuf,
    /// Extension of the compressed audio format, e.g. "mp3"; `None` keeps WAV
    pub compress_format: Option<String>,
    /// Ask the transcoder for metadata-free WAV when extracting audio for analysis
    pub strip_bitexact: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            ffmpeg_path: resolve_ffmpeg_path(),
            work_dir: env::temp_dir().join("narration-export"),
            compress_format: None,
            strip_bitexact: true,
        }
    }
}

impl ExportConfig {
    /// Reads a JSON config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("Loading config from: {:?}", path);
        let json = fs::read_to_string(path)?;
        let config: ExportConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(ref format) = self.compress_format {
            if format.is_empty() || format.contains(|c| matches!(c, '/' | '\\' | '.')) {
                return Err(Error::Config(format!(
                    "compress_format must be a bare extension, got {:?}",
                    format
                )));
            }
        }
        Ok(())
    }

    /// Creates the work directory if needed
    pub fn ensure_work_dir(&self) -> Result<&Path> {
        if !self.work_dir.exists() {
            fs::create_dir_all(&self.work_dir)?;
        }
        Ok(&self.work_dir)
    }
}

/// Finds the transcoder: the override variable, a bundled copy next to the
/// executable or under `./binaries`, then whatever `ffmpeg` is on PATH
pub fn resolve_ffmpeg_path() -> PathBuf {
    if let Some(path) = env::var_os(FFMPEG_ENV) {
        return PathBuf::from(path);
    }

    let filename = format!("ffmpeg{}", env::consts::EXE_SUFFIX);

    // Bundled next to the executable (release)
    let current_exe = env::current_exe().unwrap_or_default();
    let exe_dir = current_exe.parent().unwrap_or(Path::new("."));
    let path_prod = exe_dir.join(&filename);
    if path_prod.exists() {
        return path_prod;
    }

    // Development checkout
    let path_dev = env::current_dir().unwrap_or_default().join("binaries").join(&filename);
    if path_dev.exists() {
        return path_dev;
    }

    log::warn!("Could not find bundled '{}'. Falling back to system path.", filename);
    PathBuf::from(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert!(config.work_dir.ends_with("narration-export"));
        assert_eq!(config.compress_format, None);
        assert!(config.strip_bitexact);
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"compress_format": "mp3", "ffmpeg_path": "/opt/ffmpeg"}"#).unwrap();

        let config = ExportConfig::load(&path).unwrap();
        assert_eq!(config.compress_format.as_deref(), Some("mp3"));
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg"));
        assert!(config.strip_bitexact);
    }

    #[test]
    fn test_rejects_path_like_format() {
        let config = ExportConfig {
            compress_format: Some(".mp3".to_string()),
            ..ExportConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_ensure_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            work_dir: dir.path().join("nested").join("work"),
            ..ExportConfig::default()
        };
        let work_dir = config.ensure_work_dir().unwrap();
        assert!(work_dir.is_dir());
    }
}
