//! Configuration loading.
//!
//! The config file is TOML, read from `~/.config/nanokontroller/config.toml`
//! unless overridden on the command line. The `[keymap]` section maps
//! control names to action strings; `[audiooutputs]`, `[audioinputs]` and
//! `[streams]` give short aliases to PulseAudio sink names, source names and
//! stream name suffixes respectively.
//!
//! Bad keymap entries are diagnosed and skipped rather than failing the
//! whole load, so one typo doesn't take the rest of the surface down.

use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::actions::ActionSpec;
use crate::controls::Control;

/// Default substring used to pick the MIDI port.
pub const DEFAULT_PORT_MATCH: &str = "nanoKONTROL2";

/// On-disk config shape.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    midi: MidiSection,
    keymap: BTreeMap<String, String>,
    #[serde(default)]
    audiooutputs: BTreeMap<String, String>,
    #[serde(default)]
    audioinputs: BTreeMap<String, String>,
    #[serde(default)]
    streams: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct MidiSection {
    /// Case-insensitive substring matched against MIDI port names.
    port: Option<String>,
}

/// One bound keymap line.
#[derive(Debug, Clone)]
pub struct KeymapEntry {
    pub control: Control,
    pub action: ActionSpec,
}

/// A keymap line that was skipped, with the reason.
#[derive(Debug, Clone)]
pub struct IgnoredEntry {
    pub key: String,
    pub reason: String,
}

/// Loaded and validated configuration.
#[derive(Debug)]
pub struct Config {
    /// Where the config was read from.
    pub path: PathBuf,
    /// MIDI port name substring.
    pub port_match: String,
    /// Parsed keymap lines.
    pub keymap: Vec<KeymapEntry>,
    /// Keymap lines that didn't parse, kept for `show`/`check` reporting.
    pub ignored: Vec<IgnoredEntry>,
    /// Alias -> PulseAudio sink name.
    pub sinks: BTreeMap<String, String>,
    /// Alias -> PulseAudio source name.
    pub sources: BTreeMap<String, String>,
    /// Alias -> sink-input name suffix.
    pub streams: BTreeMap<String, String>,
}

impl Config {
    /// Default config file location: `~/.config/nanokontroller/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("could not determine the user config directory")?;
        Ok(base.join("nanokontroller").join("config.toml"))
    }

    /// Load from an explicit path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::default_path()?,
        };
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Config::parse(&content, path)
    }

    /// Parse config text. `path` is recorded for diagnostics only.
    pub fn parse(content: &str, path: PathBuf) -> Result<Config> {
        let raw: RawConfig = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let mut keymap = Vec::new();
        let mut ignored = Vec::new();
        for (key, value) in &raw.keymap {
            let control = match key.parse::<Control>() {
                Ok(control) => control,
                Err(err) => {
                    warn!("keymap: {err}");
                    ignored.push(IgnoredEntry {
                        key: key.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            match ActionSpec::parse(value) {
                Ok(action) => keymap.push(KeymapEntry { control, action }),
                Err(err) => {
                    let reason = format!("{err:#}");
                    warn!("keymap: {key}: {reason}");
                    ignored.push(IgnoredEntry {
                        key: key.clone(),
                        reason,
                    });
                }
            }
        }

        Ok(Config {
            path,
            port_match: raw
                .midi
                .port
                .unwrap_or_else(|| DEFAULT_PORT_MATCH.to_string()),
            keymap,
            ignored,
            sinks: raw.audiooutputs,
            sources: raw.audioinputs,
            streams: raw.streams,
        })
    }

    /// All evdev keys referenced by key actions.
    pub fn referenced_keys(&self) -> Vec<evdev::Key> {
        let mut keys: Vec<evdev::Key> = self
            .keymap
            .iter()
            .filter_map(|entry| match entry.action {
                ActionSpec::Key(key) => Some(key),
                _ => None,
            })
            .collect();
        keys.sort_unstable_by_key(|k| k.code());
        keys.dedup();
        keys
    }

    /// Whether any keymap line runs a shell command.
    pub fn has_exec_actions(&self) -> bool {
        self.keymap
            .iter()
            .any(|entry| matches!(entry.action, ActionSpec::Exec { .. }))
    }

    /// Print the configuration for `show config`.
    pub fn print(&self) {
        println!("Configuration ({}):", self.path.display());
        println!("  MIDI port match: {}", self.port_match);
        println!("  Keymap entries: {}", self.keymap.len());
        if !self.ignored.is_empty() {
            println!("  Ignored entries: {}", self.ignored.len());
            for entry in &self.ignored {
                println!("    {}: {}", entry.key, entry.reason);
            }
        }
        if !self.sinks.is_empty() {
            println!("  Outputs:");
            for (alias, name) in &self.sinks {
                println!("    {alias} = {name}");
            }
        }
        if !self.sources.is_empty() {
            println!("  Inputs:");
            for (alias, name) in &self.sources {
                println!("    {alias} = {name}");
            }
        }
        if !self.streams.is_empty() {
            println!("  Streams:");
            for (alias, suffix) in &self.streams {
                println!("    {alias} = *{suffix}");
            }
        }
    }
}
