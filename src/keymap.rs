//! Binding the parsed keymap to live PulseAudio state.
//!
//! Device aliases resolve to concrete sink/source indices by exact name
//! match; stream aliases resolve to sink-input indices by name suffix.
//! Resolution works on plain snapshots so it can be exercised in tests
//! without a server.

use anyhow::Result;
use log::{debug, warn};
use std::collections::BTreeMap;

use crate::actions::ActionSpec;
use crate::config::Config;
use crate::controls::Control;
use crate::pulse::{DeviceInfo, DeviceKind, StreamInfo};

/// A resolved audio device target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    pub kind: DeviceKind,
    pub index: u32,
    pub channels: u8,
    pub name: String,
}

/// A resolved sink-input target. Streams vanish when their application
/// stops playing, so this is re-resolvable via [`ActionMap::rebind_streams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRef {
    pub index: u32,
    pub channels: u8,
}

/// A keymap action bound to its backend target.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Key {
        key: evdev::Key,
    },
    Mute {
        device: DeviceRef,
        /// Cached mute state, seeded from the device and toggled on press.
        muted: bool,
    },
    DeviceVolume {
        device: DeviceRef,
        max_percent: f32,
    },
    StreamVolume {
        alias: String,
        suffix: String,
        target: Option<StreamRef>,
        max_percent: f32,
    },
    Exec {
        template: String,
    },
}

/// The bound control-number -> action table the dispatch loop works from.
#[derive(Debug, Default)]
pub struct ActionMap {
    bindings: BTreeMap<u8, Binding>,
}

impl ActionMap {
    /// Bind `config`'s keymap against snapshots of the audio state.
    ///
    /// Entries whose alias is missing from the config or whose device isn't
    /// present are skipped with a warning; a stream alias with no current
    /// match stays bound and resolves later. This mirrors config parsing:
    /// one bad line never takes the surface down.
    pub fn build(config: &Config, devices: &[DeviceInfo], streams: &[StreamInfo]) -> ActionMap {
        let mut bindings = BTreeMap::new();

        for entry in &config.keymap {
            let control = entry.control;
            let binding = match &entry.action {
                ActionSpec::Key(key) => Some(Binding::Key { key: *key }),

                ActionSpec::Mute { device } => {
                    resolve_device(config, devices, device).map(|device| Binding::Mute {
                        muted: device_mute(devices, &device),
                        device,
                    })
                }

                ActionSpec::DeviceVolume {
                    device,
                    max_percent,
                } => resolve_device(config, devices, device).map(|device| Binding::DeviceVolume {
                    device,
                    max_percent: *max_percent,
                }),

                ActionSpec::StreamVolume {
                    stream,
                    max_percent,
                } => match config.streams.get(stream) {
                    None => {
                        warn!("{control}: no [streams] entry for alias '{stream}'");
                        None
                    }
                    Some(suffix) => {
                        let target = resolve_stream(streams, suffix);
                        if target.is_none() {
                            debug!("{control}: stream '{stream}' not playing yet");
                        }
                        Some(Binding::StreamVolume {
                            alias: stream.clone(),
                            suffix: suffix.clone(),
                            target,
                            max_percent: *max_percent,
                        })
                    }
                },

                ActionSpec::Exec { command } => Some(Binding::Exec {
                    template: command.clone(),
                }),
            };

            if let Some(binding) = binding {
                bindings.insert(control.cc(), binding);
            }
        }

        ActionMap { bindings }
    }

    pub fn get_mut(&mut self, cc: u8) -> Option<&mut Binding> {
        self.bindings.get_mut(&cc)
    }

    pub fn get(&self, cc: u8) -> Option<&Binding> {
        self.bindings.get(&cc)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether any binding needs the uinput keyboard.
    pub fn needs_keyboard(&self) -> bool {
        self.bindings
            .values()
            .any(|b| matches!(b, Binding::Key { .. }))
    }

    /// Re-resolve every stream binding against a fresh sink-input listing.
    pub fn rebind_streams(&mut self, streams: &[StreamInfo]) {
        for binding in self.bindings.values_mut() {
            if let Binding::StreamVolume {
                alias,
                suffix,
                target,
                ..
            } = binding
            {
                *target = resolve_stream(streams, suffix);
                match target {
                    Some(stream) => debug!("stream '{alias}' now sink input #{}", stream.index),
                    None => debug!("stream '{alias}' has no matching sink input"),
                }
            }
        }
    }

    /// Print the bound table for `show keymap`.
    pub fn print(&self) {
        println!("Bound controls: {}", self.bindings.len());
        for (cc, binding) in &self.bindings {
            let name = Control::from_cc(*cc)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| format!("CC {cc}"));
            let desc = match binding {
                Binding::Key { key } => format!("key {key:?}"),
                Binding::Mute { device, muted } => format!(
                    "mute {} #{} (currently {})",
                    device.kind,
                    device.index,
                    if *muted { "muted" } else { "unmuted" }
                ),
                Binding::DeviceVolume {
                    device,
                    max_percent,
                } => format!(
                    "volume {} #{} (max {max_percent}%)",
                    device.kind, device.index
                ),
                Binding::StreamVolume {
                    alias,
                    target,
                    max_percent,
                    ..
                } => match target {
                    Some(stream) => {
                        format!("stream '{alias}' -> #{} (max {max_percent}%)", stream.index)
                    }
                    None => format!("stream '{alias}' (not playing, max {max_percent}%)"),
                },
                Binding::Exec { template } => format!("exec `{template}`"),
            };
            println!("  {name:<14} {desc}");
        }
    }

    /// Aliases referenced by the keymap that don't resolve against the
    /// given snapshots. Used by `check`.
    pub fn unresolved(config: &Config, devices: &[DeviceInfo]) -> Vec<String> {
        let mut missing = Vec::new();
        for entry in &config.keymap {
            let alias = match &entry.action {
                ActionSpec::Mute { device } | ActionSpec::DeviceVolume { device, .. } => device,
                _ => continue,
            };
            if lookup_device(config, devices, alias).is_none() && !missing.contains(alias) {
                missing.push(alias.clone());
            }
        }
        missing
    }
}

/// Find the configured PulseAudio name for `alias` and the matching device.
fn lookup_device<'d>(
    config: &Config,
    devices: &'d [DeviceInfo],
    alias: &str,
) -> Option<&'d DeviceInfo> {
    if let Some(name) = config.sinks.get(alias) {
        return devices
            .iter()
            .find(|d| d.kind == DeviceKind::Sink && d.name == *name);
    }
    if let Some(name) = config.sources.get(alias) {
        return devices
            .iter()
            .find(|d| d.kind == DeviceKind::Source && d.name == *name);
    }
    None
}

fn resolve_device(config: &Config, devices: &[DeviceInfo], alias: &str) -> Option<DeviceRef> {
    match lookup_device(config, devices, alias) {
        Some(device) => Some(DeviceRef {
            kind: device.kind,
            index: device.index,
            channels: device.channels,
            name: device.name.clone(),
        }),
        None => {
            warn!("audio device alias '{alias}' did not resolve; entry skipped");
            None
        }
    }
}

fn device_mute(devices: &[DeviceInfo], device: &DeviceRef) -> bool {
    devices
        .iter()
        .find(|d| d.kind == device.kind && d.index == device.index)
        .map(|d| d.mute)
        .unwrap_or(false)
}

/// Streams are matched by name suffix, e.g. a suffix of `- YouTube` matches
/// any tab playing YouTube.
fn resolve_stream(streams: &[StreamInfo], suffix: &str) -> Option<StreamRef> {
    streams
        .iter()
        .find(|s| s.name.ends_with(suffix))
        .map(|s| StreamRef {
            index: s.index,
            channels: s.channels,
        })
}

/// Build the map from live PulseAudio state.
pub fn bind_live(config: &Config, pulse: &mut crate::pulse::PulseSession) -> Result<ActionMap> {
    let devices = pulse.devices()?;
    let streams = pulse.streams()?;
    Ok(ActionMap::build(config, &devices, &streams))
}
