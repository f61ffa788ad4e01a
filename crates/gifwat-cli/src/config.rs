use gifwat_core::InteractionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub interaction: InteractionConfig,
    pub clipboard: Option<Clipboard>,
    pub log: Option<Log>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Storage {
    /// JSON file holding the collection; defaults under the data dir
    pub data_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Clipboard {
    /// Prefer wl-copy even when WAYLAND_DISPLAY is unset
    pub force_wl_copy: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Log {
    /// Default tracing filter when RUST_LOG is unset (e.g. "info", "gifwat_core=debug")
    pub level: Option<String>,
}

impl Settings {
    pub fn force_wl_copy(&self) -> bool {
        self.clipboard
            .as_ref()
            .and_then(|c| c.force_wl_copy)
            .unwrap_or(false)
    }

    pub fn log_level(&self) -> &str {
        self.log
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("warn")
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(bd) = directories::BaseDirs::new() {
        bd.config_dir().join("gifwat")
    } else {
        PathBuf::from("./.config/gifwat")
    }
}

pub fn data_dir() -> PathBuf {
    if let Some(bd) = directories::BaseDirs::new() {
        bd.data_dir().join("gifwat")
    } else {
        config_dir()
    }
}

pub fn state_dir() -> PathBuf {
    // Prefer XDG state dir when available; fall back to the data dir
    if let Some(bd) = directories::BaseDirs::new() {
        if let Some(sd) = bd.state_dir() {
            return sd.join("gifwat");
        }
    }
    data_dir()
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

pub fn data_path(settings: &Settings) -> PathBuf {
    if let Some(p) = &settings.storage.data_path {
        if !p.trim().is_empty() {
            return PathBuf::from(shellexpand::tilde(p).to_string());
        }
    }
    data_dir().join("gifs.json")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    match std::fs::read_to_string(&path) {
        Ok(s) => match toml::from_str(&s) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_interaction_section_keeps_defaults() {
        let s: Settings = toml::from_str(
            r#"
            [interaction]
            columns = 4

            [clipboard]
            force_wl_copy = true
            "#,
        )
        .unwrap();
        assert_eq!(s.interaction.columns, 4);
        assert_eq!(s.interaction.confirm_ms, 3000);
        assert_eq!(s.interaction.max_retries, 3);
        assert!(s.force_wl_copy());
        assert_eq!(s.log_level(), "warn");
    }

    #[test]
    fn explicit_data_path_expands_tilde() {
        let s = Settings {
            storage: Storage {
                data_path: Some("~/gifs/library.json".into()),
            },
            ..Default::default()
        };
        let p = data_path(&s);
        assert!(p.ends_with("gifs/library.json"));
        assert!(!p.to_string_lossy().starts_with('~'));
    }
}
