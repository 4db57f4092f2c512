//! Shell command execution for `exec/` actions.
//!
//! Commands run detached through `sh -c` so a slow command can't stall the
//! MIDI event loop. A reaper thread waits on each child to keep zombies out
//! of the process table.

use anyhow::{Context, Result};
use log::debug;
use std::process::{Command, Stdio};
use std::thread;

/// Placeholder expanded to the controller number.
pub const KEY_ID_PLACEHOLDER: &str = "{NK_KEY_ID}";
/// Placeholder expanded to the controller value.
pub const KEY_VALUE_PLACEHOLDER: &str = "{NK_KEY_VALUE}";

/// Expand the control/value placeholders in a command template.
pub fn fill_template(template: &str, control: u8, value: u8) -> String {
    template
        .replace(KEY_ID_PLACEHOLDER, &control.to_string())
        .replace(KEY_VALUE_PLACEHOLDER, &value.to_string())
}

/// Spawn a shell command without waiting for it.
pub fn spawn_shell(command: &str) -> Result<()> {
    debug!("exec: {command}");
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn `{command}`"))?;

    thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_both_placeholders() {
        let filled = fill_template("notify-send {NK_KEY_ID} {NK_KEY_VALUE}", 41, 127);
        assert_eq!("notify-send 41 127", filled);
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        assert_eq!("systemctl suspend", fill_template("systemctl suspend", 41, 127));
    }

    #[test]
    fn repeated_placeholders_all_expand() {
        let filled = fill_template("echo {NK_KEY_VALUE} {NK_KEY_VALUE}", 0, 64);
        assert_eq!("echo 64 64", filled);
    }

    #[test]
    fn spawn_detaches() {
        spawn_shell("true").unwrap();
    }
}
