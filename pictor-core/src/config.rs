use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Service configuration. Every section and key is optional in the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
    pub text: TextConfig,
    pub ocr: OcrConfig,
    pub faces: FacesConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Durable directory holding uploads until a transform consumes them.
    pub upload_dir: PathBuf,
    /// Directory for transient transform output.
    pub processed_dir: PathBuf,
    /// Delete the uploaded source once a transform response has been built.
    pub consume_on_success: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
            processed_dir: PathBuf::from("./processed"),
            consume_on_success: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_dimension: u32,
    pub max_kernel: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_dimension: 10_000,
            max_kernel: 255,
        }
    }
}

/// Candidate text-region heuristic applied before OCR.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    pub block_radius: u32,
    pub threshold_offset: i16,
    pub dilate_radius: u8,
    pub min_area: f64,
    pub max_area: f64,
    pub min_aspect: f64,
    pub max_aspect: f64,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            block_radius: 5,
            threshold_offset: 2,
            dilate_radius: 2,
            min_area: 50.0,
            max_area: 100_000.0,
            min_aspect: 0.1,
            max_aspect: 15.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub command: PathBuf,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("tesseract"),
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FacesConfig {
    pub model_path: PathBuf,
    pub scale_factor: f32,
    /// Accepted for cascade-style configs; SeetaFace filters with
    /// `score_threshold` instead and never reads it.
    pub min_neighbors: u32,
    pub min_size: u32,
    pub score_threshold: f64,
}

impl Default for FacesConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/seeta_fd_frontal_v1.0.bin"),
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 40,
            score_threshold: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::Config;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").expect("empty config should parse");
        assert_eq!(config.server.bind.port(), 8000);
        assert_eq!(config.storage.upload_dir, Path::new("./uploads"));
        assert!(config.storage.consume_on_success);
        assert_eq!(config.faces.min_size, 40);
        assert_eq!(config.faces.min_neighbors, 5);
        assert!((config.faces.scale_factor - 1.1).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [storage]
            upload_dir = "/srv/uploads"
            consume_on_success = false

            [ocr]
            language = "deu"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.server.bind.to_string(), "0.0.0.0:9000");
        assert_eq!(config.server.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.storage.upload_dir, Path::new("/srv/uploads"));
        assert_eq!(config.storage.processed_dir, Path::new("./processed"));
        assert!(!config.storage.consume_on_success);
        assert_eq!(config.ocr.language, "deu");
        assert_eq!(config.ocr.command, Path::new("tesseract"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/definitely/not/here.toml").expect_err("missing file must fail");
        assert!(
            err.to_string().contains("/definitely/not/here.toml"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Config::from_toml("[limits]\nmax_kernel = -1").is_err());
    }
}
