//! Synthetic keyboard input through the kernel uinput facility.

use anyhow::{anyhow, Context, Result};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use log::debug;

/// Name the virtual device registers under (visible in `/proc/bus/input/devices`).
const DEVICE_NAME: &str = "nanokontroller virtual keyboard";

/// Parse an evdev key name like `KEY_PLAYPAUSE`.
pub fn parse_key(name: &str) -> Result<Key> {
    name.parse::<Key>()
        .map_err(|_| anyhow!("unknown evdev key name '{name}'"))
}

/// A uinput keyboard that can type exactly the keys it was created with.
pub struct VirtualKeyboard {
    device: VirtualDevice,
}

impl VirtualKeyboard {
    /// Create the virtual device, registering `keys` as its capabilities.
    pub fn create<I>(keys: I) -> Result<VirtualKeyboard>
    where
        I: IntoIterator<Item = Key>,
    {
        let mut capabilities = AttributeSet::<Key>::new();
        for key in keys {
            capabilities.insert(key);
        }

        let device = VirtualDeviceBuilder::new()
            .context("failed to open /dev/uinput (is the uinput module loaded and writable?)")?
            .name(DEVICE_NAME)
            .with_keys(&capabilities)
            .context("failed to register key capabilities with uinput")?
            .build()
            .context("failed to create uinput virtual keyboard")?;

        Ok(VirtualKeyboard { device })
    }

    /// Emit a key press or release, followed by a SYN report.
    pub fn emit_key(&mut self, key: Key, pressed: bool) -> Result<()> {
        debug!("uinput: {key:?} {}", if pressed { "press" } else { "release" });
        let event = InputEvent::new(EventType::KEY, key.code(), i32::from(pressed));
        self.device
            .emit(&[event])
            .with_context(|| format!("failed to write {key:?} event to uinput"))?;
        Ok(())
    }
}
