//! List command - enumerate ports, devices and streams.

use anyhow::Result;

use crate::midi;
use crate::pulse::PulseSession;

/// What to list.
pub enum ListTarget {
    /// MIDI input/output ports.
    Ports,
    /// PulseAudio sinks and sources.
    Devices,
    /// PulseAudio sink inputs (application playback streams).
    Streams,
}

/// Execute the list command.
pub fn cmd_list(target: ListTarget) -> Result<()> {
    match target {
        ListTarget::Ports => {
            let (inputs, outputs) = midi::port_names()?;
            for name in inputs {
                println!("input: {name}");
            }
            for name in outputs {
                println!("output: {name}");
            }
        }
        ListTarget::Devices => {
            let mut pulse = PulseSession::connect("nanokontroller")?;
            for device in pulse.devices()? {
                println!("{}: {}", device.kind, device.name);
            }
        }
        ListTarget::Streams => {
            let mut pulse = PulseSession::connect("nanokontroller")?;
            let streams = pulse.streams()?;
            if streams.is_empty() {
                println!("No application streams are playing.");
            }
            for stream in streams {
                println!("#{}: {}", stream.index, stream.name);
            }
        }
    }
    Ok(())
}
