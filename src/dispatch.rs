//! The daemon's event dispatch.
//!
//! Dispatch never aborts the loop: every failure is logged and the next
//! event is processed. Stream targets are the one moving part; when a bound
//! sink input disappears the bindings are re-resolved and the event retried
//! once.

use anyhow::Result;
use log::{debug, warn};

use crate::actions::{cc_fraction, is_press};
use crate::controls::Control;
use crate::exec;
use crate::keymap::{ActionMap, Binding};
use crate::midi::{ControlEvent, LedPanel};
use crate::pulse::{PulseSession, StreamGone};
use crate::uinput::VirtualKeyboard;

pub struct Dispatcher {
    map: ActionMap,
    pulse: PulseSession,
    keyboard: Option<VirtualKeyboard>,
    leds: Option<LedPanel>,
}

impl Dispatcher {
    pub fn new(
        map: ActionMap,
        pulse: PulseSession,
        keyboard: Option<VirtualKeyboard>,
        leds: Option<LedPanel>,
    ) -> Dispatcher {
        Dispatcher {
            map,
            pulse,
            keyboard,
            leds,
        }
    }

    /// Handle one Control Change event.
    pub fn handle(&mut self, event: ControlEvent) {
        if self.map.get(event.control).is_none() {
            debug!("control {} is not mapped", event.control);
            return;
        }
        if let Err(err) = self.dispatch(event) {
            warn!("action for control {} failed: {err:#}", event.control);
        }
    }

    fn set_led(&mut self, cc: u8, lit: bool) {
        if let (Some(leds), Some(control)) = (self.leds.as_mut(), Control::from_cc(cc)) {
            leds.set(control, lit);
        }
    }

    fn dispatch(&mut self, event: ControlEvent) -> Result<()> {
        let Some(binding) = self.map.get_mut(event.control) else {
            return Ok(());
        };

        match binding {
            Binding::Key { key } => {
                let key = *key;
                let pressed = is_press(event.value);
                if let Some(keyboard) = self.keyboard.as_mut() {
                    keyboard.emit_key(key, pressed)?;
                }
                self.set_led(event.control, pressed);
            }

            Binding::Mute { device, muted } => {
                // Buttons report 127 on press and 0 on release; only the
                // press toggles.
                if event.value != 127 {
                    return Ok(());
                }
                let new_state = !*muted;
                let (kind, index) = (device.kind, device.index);
                self.pulse.set_device_mute(kind, index, new_state)?;
                // Commit the cache only after the server accepted the change.
                if let Some(Binding::Mute { muted, .. }) = self.map.get_mut(event.control) {
                    *muted = new_state;
                }
                self.set_led(event.control, new_state);
            }

            Binding::DeviceVolume {
                device,
                max_percent,
            } => {
                let fraction = cc_fraction(event.value, *max_percent);
                let (kind, index, channels) = (device.kind, device.index, device.channels);
                self.pulse.set_device_volume(kind, index, channels, fraction)?;
            }

            Binding::StreamVolume {
                alias,
                target,
                max_percent,
                ..
            } => {
                let alias = alias.clone();
                let fraction = cc_fraction(event.value, *max_percent);
                let attempt = *target;
                match attempt {
                    Some(stream) => {
                        match self
                            .pulse
                            .set_stream_volume(stream.index, stream.channels, fraction)
                        {
                            Ok(()) => {}
                            Err(err) if err.is::<StreamGone>() => {
                                self.retry_stream(event.control, &alias, fraction)?;
                            }
                            Err(err) => return Err(err),
                        }
                    }
                    None => self.retry_stream(event.control, &alias, fraction)?,
                }
            }

            Binding::Exec { template } => {
                let command = exec::fill_template(template, event.control, event.value);
                exec::spawn_shell(&command)?;
            }
        }

        Ok(())
    }

    /// Re-resolve stream bindings and retry the volume change once.
    fn retry_stream(&mut self, cc: u8, alias: &str, fraction: f64) -> Result<()> {
        let streams = self.pulse.streams()?;
        self.map.rebind_streams(&streams);

        let target = match self.map.get(cc) {
            Some(Binding::StreamVolume { target, .. }) => *target,
            _ => None,
        };
        match target {
            Some(stream) => self
                .pulse
                .set_stream_volume(stream.index, stream.channels, fraction),
            None => {
                warn!("stream '{alias}' is not playing; ignoring");
                Ok(())
            }
        }
    }
}
