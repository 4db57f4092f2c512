//! Show command - displays configuration and bound keymap.

use anyhow::Result;

use crate::config::Config;
use crate::keymap;
use crate::pulse::PulseSession;

/// What to show.
pub enum ShowTarget {
    /// The resolved configuration.
    Config,
    /// The control -> action table, bound against live audio state.
    Keymap,
}

/// Execute the show command.
pub fn cmd_show(config: &Config, target: ShowTarget) -> Result<()> {
    match target {
        ShowTarget::Config => {
            config.print();
        }
        ShowTarget::Keymap => {
            let mut pulse = PulseSession::connect("nanokontroller")?;
            let map = keymap::bind_live(config, &mut pulse)?;
            map.print();
        }
    }
    Ok(())
}
