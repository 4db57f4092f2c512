//! MIDI port discovery, input decoding and LED feedback.
//!
//! Ports are picked by case-insensitive substring match against the port
//! name. The input callback runs on the MIDI backend's thread; decoded
//! Control Change events are handed to the main loop over a channel.

use anyhow::{anyhow, bail, Result};
use log::{debug, info, warn};
use midir::{
    Ignore, MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection,
};
use std::sync::mpsc::Sender;
use wmidi::{Channel, ControlFunction, MidiMessage, U7};

use crate::controls::Control;

/// Client name registered with the MIDI backend.
const CLIENT_NAME: &str = "nanokontroller";

/// A decoded Control Change event from the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub control: u8,
    pub value: u8,
}

/// Find the first port whose name contains `needle` (case-insensitive).
pub fn find_port<T: MidiIO>(io: &T, needle: &str) -> Result<T::Port> {
    let lowered = needle.to_lowercase();
    let ports = io.ports();
    for port in &ports {
        if let Ok(name) = io.port_name(port) {
            if name.to_lowercase().contains(&lowered) {
                return Ok(port.clone());
            }
        }
    }
    let available: Vec<String> = ports
        .iter()
        .filter_map(|p| io.port_name(p).ok())
        .collect();
    if available.is_empty() {
        bail!("no MIDI ports found (is the device plugged in?)");
    }
    bail!(
        "no MIDI port matching '{needle}'; available ports:\n  {}",
        available.join("\n  ")
    );
}

/// Names of all MIDI input and output ports.
pub fn port_names() -> Result<(Vec<String>, Vec<String>)> {
    let midi_in = MidiInput::new(CLIENT_NAME)
        .map_err(|err| anyhow!("failed to initialize MIDI input client: {err}"))?;
    let inputs = midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect();
    let midi_out = MidiOutput::new(CLIENT_NAME)
        .map_err(|err| anyhow!("failed to initialize MIDI output client: {err}"))?;
    let outputs = midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect();
    Ok((inputs, outputs))
}

/// Open the input port and forward Control Change events to `events`.
///
/// The returned connection must be kept alive for the callback to keep
/// firing.
pub fn connect_input(
    port_match: &str,
    events: Sender<ControlEvent>,
) -> Result<MidiInputConnection<()>> {
    let mut midi_in = MidiInput::new(CLIENT_NAME)
        .map_err(|err| anyhow!("failed to initialize MIDI input client: {err}"))?;
    midi_in.ignore(Ignore::None);

    let port = find_port(&midi_in, port_match)?;
    let port_name = midi_in
        .port_name(&port)
        .unwrap_or_else(|_| "<unnamed>".to_string());
    info!("listening on MIDI input '{port_name}'");

    let conn = midi_in
        .connect(
            &port,
            "nanokontroller-in",
            move |_timestamp, bytes, _| match MidiMessage::try_from(bytes) {
                Ok(MidiMessage::ControlChange(channel, function, value)) => {
                    let event = ControlEvent {
                        control: u8::from(function),
                        value: u8::from(value),
                    };
                    debug!(
                        "control {} value {} (channel {})",
                        event.control,
                        event.value,
                        channel.number()
                    );
                    // The receiver only goes away on shutdown.
                    let _ = events.send(event);
                }
                Ok(other) => debug!("ignoring MIDI message: {other:?}"),
                Err(err) => debug!("undecodable MIDI data ({} bytes): {err}", bytes.len()),
            },
            (),
        )
        .map_err(|err| anyhow!("failed to open MIDI input connection: {err}"))?;
    Ok(conn)
}

/// LED feedback to the surface over its MIDI output port.
///
/// The nanoKONTROL2 lights a button's LED when it receives a Control Change
/// for that controller with value 127, and clears it on value 0 (requires
/// the surface's LED mode to be set to "external").
pub struct LedPanel {
    conn: MidiOutputConnection,
}

impl LedPanel {
    /// Connect to the device's output port.
    pub fn connect(port_match: &str) -> Result<LedPanel> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|err| anyhow!("failed to initialize MIDI output client: {err}"))?;
        let port = find_port(&midi_out, port_match)?;
        let port_name = midi_out
            .port_name(&port)
            .unwrap_or_else(|_| "<unnamed>".to_string());
        info!("LED feedback on MIDI output '{port_name}'");
        let conn = midi_out
            .connect(&port, "nanokontroller-out")
            .map_err(|err| anyhow!("failed to open MIDI output connection: {err}"))?;
        Ok(LedPanel { conn })
    }

    /// Light or clear a control's LED. Controls without an LED are skipped.
    ///
    /// LED writes are best-effort: a failed send is logged, not propagated,
    /// so feedback glitches can't break dispatch.
    pub fn set(&mut self, control: Control, lit: bool) {
        if !control.has_led() {
            debug!("control {control} has no LED");
            return;
        }
        let value = if lit { 127 } else { 0 };
        let message = MidiMessage::ControlChange(
            Channel::Ch1,
            ControlFunction(U7::from_u8_lossy(control.cc())),
            U7::from_u8_lossy(value),
        );
        let mut bytes = [0_u8; 3];
        match message.copy_to_slice(&mut bytes) {
            Ok(len) => {
                if let Err(err) = self.conn.send(&bytes[..len]) {
                    warn!("failed to send LED update for {control}: {err}");
                }
            }
            Err(err) => warn!("failed to encode LED update for {control}: {err}"),
        }
    }
}
