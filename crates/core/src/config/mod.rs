//! Demo configuration, read from JSON.

use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    mixer::AudioSpec,
    scene::Scene,
    video::{WindowFlags, WindowSpec},
    Result, SdlError,
};

/// Top-level configuration of the demo driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub frame_rate: u32,
    pub scene: Scene,
    pub assets: AssetConfig,
    pub audio: AudioSpec,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            frame_rate: 60,
            scene: Scene::default(),
            assets: AssetConfig::default(),
            audio: AudioSpec::default(),
        }
    }
}

impl DemoConfig {
    /// Reads a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(SdlError::InvalidArgument(
                "frame_rate must be at least 1".to_string(),
            ));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(SdlError::InvalidArgument(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }

    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec::new(&self.window.title, self.window.width, self.window.height)
            .with_flags(WindowFlags::empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Rect".to_string(),
            width: 600,
            height: 480,
        }
    }
}

/// Files the scenes and the background sound are loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Read by `IMG_Load` for `surface-image` and by `SDL_LoadBMP` for the
    /// bitmap scenes.
    pub image: PathBuf,
    /// Played on a loop for the whole run; `None` leaves the audio device
    /// closed.
    pub audio: Option<PathBuf>,
    pub font: Option<FontConfig>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::from("./cat.bmp"),
            audio: Some(PathBuf::from("./test.ogg")),
            font: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontConfig {
    pub path: PathBuf,
    #[serde(default = "default_point_size")]
    pub point_size: u16,
}

fn default_point_size() -> u16 {
    24
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_the_demo_constants() {
        let config = DemoConfig::default();
        assert_eq!(config.window.title, "Rect");
        assert_eq!((config.window.width, config.window.height), (600, 480));
        assert_eq!(config.frame_rate, 60);
        assert_eq!(config.scene, Scene::BmpViewport);
        assert_eq!(config.assets.image, PathBuf::from("./cat.bmp"));
        assert_eq!(config.assets.audio, Some(PathBuf::from("./test.ogg")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"scene":"lines","assets":{{"audio":null,"font":{{"path":"f.ttf"}}}},"audio":{{"frequency":44100}}}}"#
        )
        .unwrap();

        let config = DemoConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.scene, Scene::Lines);
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.assets.audio, None);
        assert_eq!(config.assets.image, PathBuf::from("./cat.bmp"));
        assert_eq!(config.assets.font.unwrap().point_size, 24);
        assert_eq!(config.audio.frequency, 44_100);
        assert_eq!(config.audio.chunk_size, AudioSpec::default().chunk_size);
    }

    #[test]
    fn rejects_zero_frame_rate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"frame_rate":0}}"#).unwrap();

        let err = DemoConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, SdlError::InvalidArgument(_)));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = DemoConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, SdlError::Config(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = DemoConfig::from_json_file("./no/such/config.json").unwrap_err();
        assert!(matches!(err, SdlError::Io(_)));
    }
}
