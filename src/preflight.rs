//! Preflight checks for the daemon's runtime requirements.
//!
//! `nanokontroller check` runs every check and prints a report; with
//! `--strict` a failing report exits nonzero. Checks that touch hardware
//! (uinput, PulseAudio) really exercise it, so a passing report means `run`
//! will come up.

use std::path::Path;

use crate::config::Config;
use crate::keymap::ActionMap;
use crate::midi;
use crate::pulse::PulseSession;
use crate::uinput::VirtualKeyboard;

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass(Option<String>),
    Warn(String),
    Fail(String),
}

/// One named check with its outcome.
#[derive(Debug, Clone)]
pub struct Check {
    pub label: &'static str,
    pub outcome: Outcome,
}

impl Check {
    fn pass(label: &'static str) -> Check {
        Check {
            label,
            outcome: Outcome::Pass(None),
        }
    }

    fn pass_with(label: &'static str, details: impl Into<String>) -> Check {
        Check {
            label,
            outcome: Outcome::Pass(Some(details.into())),
        }
    }

    fn warn(label: &'static str, details: impl Into<String>) -> Check {
        Check {
            label,
            outcome: Outcome::Warn(details.into()),
        }
    }

    fn fail(label: &'static str, details: impl Into<String>) -> Check {
        Check {
            label,
            outcome: Outcome::Fail(details.into()),
        }
    }
}

/// All check outcomes, printable as a report.
#[derive(Debug, Default)]
pub struct Report {
    pub checks: Vec<Check>,
}

impl Report {
    pub fn all_passed(&self) -> bool {
        !self
            .checks
            .iter()
            .any(|c| matches!(c.outcome, Outcome::Fail(_)))
    }

    pub fn print(&self) {
        println!("=== nanokontroller preflight ===\n");
        for check in &self.checks {
            match &check.outcome {
                Outcome::Pass(None) => println!("  ✓ {}", check.label),
                Outcome::Pass(Some(details)) => println!("  ✓ {}: {details}", check.label),
                Outcome::Warn(details) => println!("  ⚠ {}: {details}", check.label),
                Outcome::Fail(details) => println!("  ✗ {}: {details}", check.label),
            }
        }
        let failed = self
            .checks
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Fail(_)))
            .count();
        println!();
        if failed == 0 {
            println!("All checks passed.");
        } else {
            println!("{failed} check(s) failed; `run` will not come up cleanly.");
        }
    }
}

/// Run every check against `config_path`.
pub fn run(config_path: Option<&Path>, port_override: Option<&str>) -> Report {
    let mut report = Report::default();

    // Config must load before anything else is worth checking.
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(err) => {
            report.checks.push(Check::fail("config", format!("{err:#}")));
            return report;
        }
    };
    if config.ignored.is_empty() {
        report.checks.push(Check::pass_with(
            "config",
            format!("{} keymap entries", config.keymap.len()),
        ));
    } else {
        report.checks.push(Check::warn(
            "config",
            format!(
                "{} keymap entries, {} ignored (see `show config`)",
                config.keymap.len(),
                config.ignored.len()
            ),
        ));
    }

    let port_match = port_override.unwrap_or(&config.port_match);
    report.checks.push(check_midi(port_match));
    report.checks.push(check_uinput(&config));
    if config.has_exec_actions() {
        report.checks.push(check_shell());
    }

    // PulseAudio and everything that needs the live device list.
    match PulseSession::connect("nanokontroller-check") {
        Err(err) => report.checks.push(Check::fail("pulseaudio", format!("{err:#}"))),
        Ok(mut pulse) => {
            report.checks.push(Check::pass("pulseaudio"));
            match pulse.devices() {
                Err(err) => report
                    .checks
                    .push(Check::fail("audio devices", format!("{err:#}"))),
                Ok(devices) => {
                    let missing = ActionMap::unresolved(&config, &devices);
                    if missing.is_empty() {
                        report.checks.push(Check::pass_with(
                            "audio devices",
                            format!("{} present", devices.len()),
                        ));
                    } else {
                        report.checks.push(Check::fail(
                            "audio devices",
                            format!("unresolved aliases: {}", missing.join(", ")),
                        ));
                    }
                }
            }
            report.checks.push(check_streams(&config, &mut pulse));
        }
    }

    report
}

fn check_midi(port_match: &str) -> Check {
    match midi::port_names() {
        Err(err) => Check::fail("midi", format!("{err:#}")),
        Ok((inputs, _)) => {
            let matched = inputs
                .iter()
                .find(|name| name.to_lowercase().contains(&port_match.to_lowercase()));
            match matched {
                Some(name) => Check::pass_with("midi", name.clone()),
                None if inputs.is_empty() => {
                    Check::fail("midi", "no MIDI input ports (is the device plugged in?)")
                }
                None => Check::fail(
                    "midi",
                    format!(
                        "no input port matching '{port_match}' (available: {})",
                        inputs.join(", ")
                    ),
                ),
            }
        }
    }
}

fn check_uinput(config: &Config) -> Check {
    let keys = config.referenced_keys();
    if keys.is_empty() {
        return Check::pass_with("uinput", "no key actions configured, skipped");
    }
    match VirtualKeyboard::create(keys.iter().copied()) {
        Ok(_) => Check::pass_with("uinput", format!("{} key(s) registered", keys.len())),
        Err(err) => Check::fail("uinput", format!("{err:#}")),
    }
}

fn check_shell() -> Check {
    match which::which("sh") {
        Ok(path) => Check::pass_with("shell", path.display().to_string()),
        Err(_) => Check::fail("shell", "`sh` not found in PATH; exec actions will fail"),
    }
}

fn check_streams(config: &Config, pulse: &mut PulseSession) -> Check {
    if config.streams.is_empty() {
        return Check::pass_with("streams", "none configured, skipped");
    }
    match pulse.streams() {
        Err(err) => Check::fail("streams", format!("{err:#}")),
        Ok(streams) => {
            let silent: Vec<&str> = config
                .streams
                .iter()
                .filter(|(_, suffix)| !streams.iter().any(|s| s.name.ends_with(suffix.as_str())))
                .map(|(alias, _)| alias.as_str())
                .collect();
            if silent.is_empty() {
                Check::pass_with("streams", format!("{} configured, all playing", config.streams.len()))
            } else {
                // Streams come and go with their applications; absence is
                // expected, not an error.
                Check::warn("streams", format!("not currently playing: {}", silent.join(", ")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_verdict() {
        let mut report = Report::default();
        report.checks.push(Check::pass("a"));
        report.checks.push(Check::warn("b", "meh"));
        assert!(report.all_passed());
        report.checks.push(Check::fail("c", "broken"));
        assert!(!report.all_passed());
    }
}
