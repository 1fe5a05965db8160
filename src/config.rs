use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Name stamped into last_edited_by / uploaded_by fields.
    #[serde(default)]
    pub auditor: Option<String>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the blob store.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

fn default_storage_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("auditplan")
        .join("blobs")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Byte budget for the full variant of an uploaded image.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Longer-edge cap for the full variant, in pixels.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// Target width of the thumbnail's longer dimension, in pixels.
    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,

    /// JPEG quality (1-100) both variants start from.
    #[serde(default = "default_quality")]
    pub quality: u8,
}

fn default_max_bytes() -> u64 {
    1024 * 1024 // 1 MiB
}

fn default_max_dimension() -> u32 {
    1920
}

fn default_thumbnail_width() -> u32 {
    200
}

fn default_quality() -> u8 {
    80
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            max_dimension: default_max_dimension(),
            thumbnail_width: default_thumbnail_width(),
            quality: default_quality(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Shared secret that unlocks edit mode. Convenience, not security.
    #[serde(default = "default_session_secret")]
    pub secret: String,

    /// Hours an unlock stays valid, measured from unlock time.
    #[serde(default = "default_session_timeout_hours")]
    pub timeout_hours: i64,
}

fn default_session_secret() -> String {
    "edit123".to_string()
}

fn default_session_timeout_hours() -> i64 {
    4
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: default_session_secret(),
            timeout_hours: default_session_timeout_hours(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageProtocol {
    #[default]
    Auto,
    Sixel,
    Kitty,
    ITerm2,
    Halfblocks,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PreviewConfig {
    /// Terminal graphics protocol for rendering the floor plan.
    #[serde(default)]
    pub protocol: ImageProtocol,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("auditplan")
        .join("auditplan.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            auditor: None,
            storage: StorageConfig::default(),
            images: ImagesConfig::default(),
            session: SessionConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("auditplan")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Where the edit-session unlock state lives.
    pub fn session_state_path() -> PathBuf {
        Self::config_dir().join("session.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_fills_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.images.thumbnail_width, 200);
        assert_eq!(config.session.timeout_hours, 4);
        assert_eq!(config.preview.protocol, ImageProtocol::Auto);
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            auditor = "pat"

            [images]
            max_dimension = 1280
            "#,
        )
        .unwrap();
        assert_eq!(config.auditor.as_deref(), Some("pat"));
        assert_eq!(config.images.max_dimension, 1280);
        assert_eq!(config.images.quality, 80);
    }
}
