//! Synchronous PulseAudio client.
//!
//! libpulse is callback-driven; this wrapper owns a standard mainloop and
//! iterates it until each operation completes, giving the rest of the daemon
//! a plain blocking API. Every call goes through [`PulseSession::wait_op`],
//! which also surfaces mainloop failures as errors instead of hangs.

use anyhow::{anyhow, bail, ensure, Context as _, Result};
use libpulse_binding as pa;
use pa::callbacks::ListResult;
use pa::context::introspect::{SinkInfo, SinkInputInfo, SourceInfo};
use pa::context::{Context, FlagSet as ContextFlagSet, State};
use pa::mainloop::standard::{IterateResult, Mainloop};
use pa::operation::{Operation, State as OperationState};
use pa::proplist::{properties, Proplist};
use pa::volume::{ChannelVolumes, Volume};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Whether a device plays audio or records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Sink,
    Source,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Sink => f.write_str("output"),
            DeviceKind::Source => f.write_str("input"),
        }
    }
}

/// Snapshot of a sink or source.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub kind: DeviceKind,
    pub index: u32,
    pub name: String,
    pub description: String,
    pub channels: u8,
    pub mute: bool,
}

/// Snapshot of a sink input (an application playback stream).
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub index: u32,
    pub name: String,
    pub channels: u8,
}

/// Error marker for operations against a sink input that no longer exists.
/// Applications close their streams at any time, so callers treat this as
/// a cue to re-resolve rather than as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGone(pub u32);

impl fmt::Display for StreamGone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink input #{} is gone", self.0)
    }
}

impl std::error::Error for StreamGone {}

/// A connected PulseAudio session.
pub struct PulseSession {
    mainloop: Mainloop,
    context: Context,
}

impl PulseSession {
    /// Connect to the user's PulseAudio server.
    pub fn connect(app_name: &str) -> Result<PulseSession> {
        let mut proplist = Proplist::new().context("failed to allocate PulseAudio proplist")?;
        proplist
            .set_str(properties::APPLICATION_NAME, app_name)
            .map_err(|_| anyhow!("failed to set PulseAudio application name"))?;

        let mut mainloop = Mainloop::new().context("failed to create PulseAudio mainloop")?;
        let mut context = Context::new_with_proplist(&mainloop, app_name, &proplist)
            .context("failed to create PulseAudio context")?;
        context
            .connect(None, ContextFlagSet::NOFLAGS, None)
            .map_err(|err| anyhow!("failed to connect to PulseAudio: {err}"))?;

        loop {
            match mainloop.iterate(true) {
                IterateResult::Success(_) => {}
                IterateResult::Quit(_) => bail!("PulseAudio mainloop quit while connecting"),
                IterateResult::Err(err) => {
                    bail!("PulseAudio mainloop error while connecting: {err}")
                }
            }
            match context.get_state() {
                State::Ready => break,
                State::Failed => bail!("PulseAudio connection failed (is the server running?)"),
                State::Terminated => bail!("PulseAudio connection terminated while connecting"),
                _ => {}
            }
        }

        Ok(PulseSession { mainloop, context })
    }

    /// Drive the mainloop until `op` completes.
    fn wait_op<G: ?Sized>(&mut self, op: Operation<G>) -> Result<()> {
        loop {
            match self.mainloop.iterate(true) {
                IterateResult::Success(_) => {}
                IterateResult::Quit(_) => bail!("PulseAudio mainloop quit mid-operation"),
                IterateResult::Err(err) => bail!("PulseAudio mainloop error: {err}"),
            }
            match op.get_state() {
                OperationState::Running => {}
                OperationState::Done => return Ok(()),
                OperationState::Cancelled => bail!("PulseAudio operation cancelled"),
            }
        }
    }

    /// List playback devices (sinks).
    pub fn sinks(&mut self) -> Result<Vec<DeviceInfo>> {
        let found = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&found);
        let op = self
            .context
            .introspect()
            .get_sink_info_list(move |res: ListResult<&SinkInfo>| {
                if let ListResult::Item(info) = res {
                    sink.borrow_mut().push(DeviceInfo {
                        kind: DeviceKind::Sink,
                        index: info.index,
                        name: info.name.as_deref().unwrap_or_default().to_string(),
                        description: info.description.as_deref().unwrap_or_default().to_string(),
                        channels: info.volume.len(),
                        mute: info.mute,
                    });
                }
            });
        self.wait_op(op)?;
        Ok(found.take())
    }

    /// List capture devices (sources).
    pub fn sources(&mut self) -> Result<Vec<DeviceInfo>> {
        let found = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&found);
        let op = self
            .context
            .introspect()
            .get_source_info_list(move |res: ListResult<&SourceInfo>| {
                if let ListResult::Item(info) = res {
                    sink.borrow_mut().push(DeviceInfo {
                        kind: DeviceKind::Source,
                        index: info.index,
                        name: info.name.as_deref().unwrap_or_default().to_string(),
                        description: info.description.as_deref().unwrap_or_default().to_string(),
                        channels: info.volume.len(),
                        mute: info.mute,
                    });
                }
            });
        self.wait_op(op)?;
        Ok(found.take())
    }

    /// List sinks then sources, the order `list devices` prints them in.
    pub fn devices(&mut self) -> Result<Vec<DeviceInfo>> {
        let mut devices = self.sinks()?;
        devices.extend(self.sources()?);
        Ok(devices)
    }

    /// List application playback streams (sink inputs).
    pub fn streams(&mut self) -> Result<Vec<StreamInfo>> {
        let found = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&found);
        let op = self
            .context
            .introspect()
            .get_sink_input_info_list(move |res: ListResult<&SinkInputInfo>| {
                if let ListResult::Item(info) = res {
                    sink.borrow_mut().push(StreamInfo {
                        index: info.index,
                        name: info.name.as_deref().unwrap_or_default().to_string(),
                        channels: info.volume.len(),
                    });
                }
            });
        self.wait_op(op)?;
        Ok(found.take())
    }

    /// Set a device's volume on all channels to a fraction of nominal.
    pub fn set_device_volume(
        &mut self,
        kind: DeviceKind,
        index: u32,
        channels: u8,
        fraction: f64,
    ) -> Result<()> {
        let cv = volume_for_fraction(channels, fraction);
        let done = Rc::new(Cell::new(None));
        let flag = Rc::clone(&done);
        let mut introspect = self.context.introspect();
        let op = match kind {
            DeviceKind::Sink => introspect.set_sink_volume_by_index(
                index,
                &cv,
                Some(Box::new(move |ok| flag.set(Some(ok)))),
            ),
            DeviceKind::Source => introspect.set_source_volume_by_index(
                index,
                &cv,
                Some(Box::new(move |ok| flag.set(Some(ok)))),
            ),
        };
        self.wait_op(op)?;
        ensure!(
            done.get() == Some(true),
            "PulseAudio rejected volume change for {kind} #{index}"
        );
        Ok(())
    }

    /// Mute or unmute a device.
    pub fn set_device_mute(&mut self, kind: DeviceKind, index: u32, mute: bool) -> Result<()> {
        let done = Rc::new(Cell::new(None));
        let flag = Rc::clone(&done);
        let mut introspect = self.context.introspect();
        let op = match kind {
            DeviceKind::Sink => introspect.set_sink_mute_by_index(
                index,
                mute,
                Some(Box::new(move |ok| flag.set(Some(ok)))),
            ),
            DeviceKind::Source => introspect.set_source_mute_by_index(
                index,
                mute,
                Some(Box::new(move |ok| flag.set(Some(ok)))),
            ),
        };
        self.wait_op(op)?;
        ensure!(
            done.get() == Some(true),
            "PulseAudio rejected mute change for {kind} #{index}"
        );
        Ok(())
    }

    /// Set a sink input's volume on all channels to a fraction of nominal.
    ///
    /// Fails with [`StreamGone`] when the stream has disappeared.
    pub fn set_stream_volume(&mut self, index: u32, channels: u8, fraction: f64) -> Result<()> {
        let cv = volume_for_fraction(channels, fraction);
        let done = Rc::new(Cell::new(None));
        let flag = Rc::clone(&done);
        let op = self.context.introspect().set_sink_input_volume(
            index,
            &cv,
            Some(Box::new(move |ok| flag.set(Some(ok)))),
        );
        self.wait_op(op)?;
        if done.get() != Some(true) {
            return Err(anyhow::Error::new(StreamGone(index)));
        }
        Ok(())
    }
}

impl Drop for PulseSession {
    fn drop(&mut self) {
        self.context.disconnect();
    }
}

/// Build a [`ChannelVolumes`] with every channel at `fraction` of nominal
/// volume. Fractions are clamped to PulseAudio's representable range.
pub fn volume_for_fraction(channels: u8, fraction: f64) -> ChannelVolumes {
    let max = f64::from(Volume::MAX.0) / f64::from(Volume::NORMAL.0);
    let clamped = fraction.clamp(0.0, max);
    let raw = (f64::from(Volume::NORMAL.0) * clamped).round() as u32;
    let mut cv = ChannelVolumes::default();
    cv.set(channels, Volume(raw));
    cv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fraction_is_muted() {
        let cv = volume_for_fraction(2, 0.0);
        assert_eq!(2, cv.len());
        assert!(cv.get().iter().take(2).all(|v| *v == Volume::MUTED));
    }

    #[test]
    fn unit_fraction_is_nominal() {
        let cv = volume_for_fraction(2, 1.0);
        assert!(cv.get().iter().take(2).all(|v| *v == Volume::NORMAL));
    }

    #[test]
    fn boost_scales_past_nominal() {
        let cv = volume_for_fraction(1, 1.5);
        let expected = (f64::from(Volume::NORMAL.0) * 1.5).round() as u32;
        assert_eq!(Volume(expected), cv.get()[0]);
    }

    #[test]
    fn negative_fraction_clamps_to_muted() {
        let cv = volume_for_fraction(1, -0.25);
        assert_eq!(Volume::MUTED, cv.get()[0]);
    }
}
