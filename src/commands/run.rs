//! Run command - the daemon event loop.

use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::mpsc;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::keymap::ActionMap;
use crate::midi::{self, LedPanel};
use crate::pulse::PulseSession;
use crate::uinput::VirtualKeyboard;

/// Execute the run command. Only returns on error; the loop itself runs
/// until the process is killed.
pub fn cmd_run(config: &Config, port_override: Option<&str>) -> Result<()> {
    let port_match = port_override.unwrap_or(&config.port_match);

    let (events_tx, events_rx) = mpsc::channel();
    // Keep the connection alive for the whole loop; dropping it closes the port.
    let _input = midi::connect_input(port_match, events_tx)?;

    // LED feedback is nice to have; a surface without an output port still works.
    let leds = match LedPanel::connect(port_match) {
        Ok(leds) => Some(leds),
        Err(err) => {
            warn!("LED feedback disabled: {err:#}");
            None
        }
    };

    let mut pulse = PulseSession::connect("nanokontroller")?;
    let devices = pulse.devices()?;
    let streams = pulse.streams()?;
    let map = ActionMap::build(config, &devices, &streams);
    if map.is_empty() {
        warn!("keymap bound no controls; the surface will do nothing");
    } else {
        info!("bound {} control(s)", map.len());
    }

    let keyboard = if map.needs_keyboard() {
        Some(VirtualKeyboard::create(config.referenced_keys())?)
    } else {
        None
    };

    let mut dispatcher = Dispatcher::new(map, pulse, keyboard, leds);
    info!("ready; press Ctrl-C to exit");
    loop {
        let event = events_rx
            .recv()
            .context("MIDI input connection closed unexpectedly")?;
        dispatcher.handle(event);
    }
}
