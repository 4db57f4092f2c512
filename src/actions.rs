//! Action strings and their parsed form.
//!
//! A `[keymap]` value is either a bare evdev key name (`KEY_PLAYPAUSE`) or a
//! `/`-separated action: `mute/<device>`, `volume/<device>[/<max>]`,
//! `volumestr/<stream>[/<max>]`, `exec/<command>`. Parsing is pure; aliases
//! are resolved against live PulseAudio state later, when the keymap is
//! bound.

use anyhow::{bail, Context, Result};
use evdev::Key;
use std::fmt;

/// Default volume ceiling, in percent. Values above 100 allow boosting a
/// device beyond its nominal level.
pub const DEFAULT_MAX_PERCENT: f32 = 100.0;

/// A parsed keymap action, not yet bound to any backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpec {
    /// Press/release a synthetic keyboard key.
    Key(Key),
    /// Toggle mute of an aliased PulseAudio device.
    Mute { device: String },
    /// Set the volume of an aliased PulseAudio device from the control value.
    DeviceVolume { device: String, max_percent: f32 },
    /// Set the volume of an aliased application stream from the control value.
    StreamVolume { stream: String, max_percent: f32 },
    /// Run a shell command.
    Exec { command: String },
}

impl ActionSpec {
    /// Parse a `[keymap]` value.
    pub fn parse(raw: &str) -> Result<ActionSpec> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("empty action");
        }

        let Some((verb, rest)) = raw.split_once('/') else {
            // No verb: the whole value is an evdev key name.
            let key = raw
                .parse::<Key>()
                .ok()
                .with_context(|| format!("unknown evdev key name '{raw}'"))?;
            return Ok(ActionSpec::Key(key));
        };

        match verb {
            "mute" => Ok(ActionSpec::Mute {
                device: rest.to_string(),
            }),
            "volume" => {
                let (device, max_percent) = split_max_level(rest)?;
                Ok(ActionSpec::DeviceVolume {
                    device: device.to_string(),
                    max_percent,
                })
            }
            "volumestr" => {
                let (stream, max_percent) = split_max_level(rest)?;
                Ok(ActionSpec::StreamVolume {
                    stream: stream.to_string(),
                    max_percent,
                })
            }
            "exec" => Ok(ActionSpec::Exec {
                command: rest.to_string(),
            }),
            other => bail!("unknown action '{other}'"),
        }
    }
}

impl fmt::Display for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionSpec::Key(key) => write!(f, "key {key:?}"),
            ActionSpec::Mute { device } => write!(f, "mute {device}"),
            ActionSpec::DeviceVolume {
                device,
                max_percent,
            } => write!(f, "volume {device} (max {max_percent}%)"),
            ActionSpec::StreamVolume {
                stream,
                max_percent,
            } => write!(f, "stream volume {stream} (max {max_percent}%)"),
            ActionSpec::Exec { command } => write!(f, "exec `{command}`"),
        }
    }
}

/// Split an optional `/<max>` volume ceiling off an alias.
fn split_max_level(rest: &str) -> Result<(&str, f32)> {
    match rest.split_once('/') {
        None => Ok((rest, DEFAULT_MAX_PERCENT)),
        Some((alias, max)) => {
            let max_percent: f32 = max
                .parse()
                .with_context(|| format!("invalid max volume '{max}'"))?;
            if max_percent <= 0.0 {
                bail!("max volume must be positive, got {max_percent}");
            }
            Ok((alias, max_percent))
        }
    }
}

/// Convert a controller value to a volume fraction, where 1.0 is the
/// device's nominal volume. A max level of 150 maps a full slider to 1.5.
pub fn cc_fraction(value: u8, max_percent: f32) -> f64 {
    f64::from(value) / 127.0 * f64::from(max_percent) / 100.0
}

/// Whether a button controller value counts as a press (buttons report 127
/// when pressed and 0 when released).
pub fn is_press(value: u8) -> bool {
    value >= 64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_key_name() {
        let spec = ActionSpec::parse("KEY_PLAYPAUSE").unwrap();
        assert_eq!(ActionSpec::Key(Key::KEY_PLAYPAUSE), spec);
    }

    #[test]
    fn unknown_key_name() {
        let err = ActionSpec::parse("KEY_DOES_NOT_EXIST").unwrap_err();
        assert!(err.to_string().contains("unknown evdev key name"));
    }

    #[test]
    fn mute_action() {
        let spec = ActionSpec::parse("mute/speakers").unwrap();
        assert_eq!(
            ActionSpec::Mute {
                device: "speakers".to_string()
            },
            spec
        );
    }

    #[test]
    fn volume_with_default_ceiling() {
        let spec = ActionSpec::parse("volume/speakers").unwrap();
        assert_eq!(
            ActionSpec::DeviceVolume {
                device: "speakers".to_string(),
                max_percent: DEFAULT_MAX_PERCENT,
            },
            spec
        );
    }

    #[test]
    fn volume_with_ceiling() {
        let spec = ActionSpec::parse("volume/headset/150").unwrap();
        assert_eq!(
            ActionSpec::DeviceVolume {
                device: "headset".to_string(),
                max_percent: 150.0,
            },
            spec
        );
    }

    #[test]
    fn stream_volume() {
        let spec = ActionSpec::parse("volumestr/music/120").unwrap();
        assert_eq!(
            ActionSpec::StreamVolume {
                stream: "music".to_string(),
                max_percent: 120.0,
            },
            spec
        );
    }

    #[test]
    fn exec_keeps_slashes() {
        let spec = ActionSpec::parse("exec/notify-send pressed {NK_KEY_ID}/{NK_KEY_VALUE}").unwrap();
        assert_eq!(
            ActionSpec::Exec {
                command: "notify-send pressed {NK_KEY_ID}/{NK_KEY_VALUE}".to_string()
            },
            spec
        );
    }

    #[test]
    fn rejects_unknown_verb() {
        let err = ActionSpec::parse("warp/speakers").unwrap_err();
        assert!(err.to_string().contains("unknown action"));
    }

    #[test]
    fn rejects_bad_ceiling() {
        assert!(ActionSpec::parse("volume/speakers/loud").is_err());
        assert!(ActionSpec::parse("volume/speakers/-20").is_err());
    }

    #[test]
    fn fraction_scales_with_ceiling() {
        assert_eq!(0.0, cc_fraction(0, 100.0));
        assert_eq!(1.0, cc_fraction(127, 100.0));
        assert!((cc_fraction(127, 150.0) - 1.5).abs() < 1e-9);
        assert!((cc_fraction(64, 100.0) - 64.0 / 127.0).abs() < 1e-9);
    }

    #[test]
    fn press_threshold() {
        assert!(is_press(127));
        assert!(!is_press(0));
    }
}
