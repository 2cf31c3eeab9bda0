use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::codec::AssembleOptions;
use crate::core::Patch;

const CONFIG_DIR: &str = "preenfm3-editor";
const CONFIG_FILE: &str = "config.json";

/// Editor settings, stored as JSON in the user's config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 1..=16
    pub midi_channel: u8,
    /// Port names to connect to. When unset, the first port whose name mentions the synth is used.
    pub input_port: Option<String>,
    pub output_port: Option<String>,
    /// Minimum gap between two sends of the same plain CC.
    pub cc_throttle_ms: u64,
    /// A dump is complete once no NRPN arrived for this long.
    pub dump_idle_ms: u64,
    /// Give up on a dump request after this long without any answer.
    pub dump_timeout_ms: u64,
    /// Name for dumps that carry no preset name.
    pub default_patch_name: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            midi_channel: 1,
            input_port: None,
            output_port: None,
            cc_throttle_ms: 20,
            dump_idle_ms: 500,
            dump_timeout_ms: 5000,
            default_patch_name: "MIDI Patch".to_string(),
        }
    }
}

impl EditorConfig {
    /// `<config dir>/preenfm3-editor/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// 0-based channel for building status bytes.
    pub fn channel_index(&self) -> u8 {
        self.midi_channel.clamp(1, 16) - 1
    }

    /// Assembly options for a dump replacing `previous`.
    pub fn assemble_options(&self, previous: &Patch) -> AssembleOptions {
        AssembleOptions {
            default_name: self.default_patch_name.clone(),
            ..AssembleOptions::keeping(previous)
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Load the config at `path`, writing defaults there first if it doesn't exist. A file
    /// that can't be parsed is reported and replaced by defaults in memory only.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to_file(path)?;
            info!("Created default config at {}", path.display());
            return Ok(config);
        }

        match Self::load_from_file(path) {
            Ok(config) => Ok(config),
            Err(err) => {
                warn!("{:#}; using defaults", err);
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = EditorConfig::load_or_create(&path).unwrap();
        assert_eq!(config, EditorConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = EditorConfig {
            midi_channel: 3,
            output_port: Some("PreenFM3 MIDI 1".to_string()),
            dump_idle_ms: 250,
            ..EditorConfig::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(EditorConfig::load_or_create(&path).unwrap(), config);
        assert_eq!(config.channel_index(), 2);
    }

    #[test]
    fn partial_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        fs::write(&path, r#"{ "midi_channel": 10 }"#).unwrap();
        let config = EditorConfig::load_from_file(&path).unwrap();
        assert_eq!(config.midi_channel, 10);
        assert_eq!(config.cc_throttle_ms, 20);

        fs::write(&path, "not json").unwrap();
        assert!(EditorConfig::load_from_file(&path).is_err());
        assert_eq!(
            EditorConfig::load_or_create(&path).unwrap(),
            EditorConfig::default()
        );
    }

    #[test]
    fn assemble_options_keep_polyphony() {
        let mut previous = Patch::default();
        previous.global.polyphony = 5;
        let config = EditorConfig {
            default_patch_name: "Dump".to_string(),
            ..EditorConfig::default()
        };
        let options = config.assemble_options(&previous);
        assert_eq!(options.polyphony, 5);
        assert_eq!(options.default_name, "Dump");
    }
}
