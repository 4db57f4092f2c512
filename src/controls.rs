//! nanoKONTROL2 control surface layout.
//!
//! Every button, slider and knob on the surface reports as a MIDI Control
//! Change with a fixed controller number. The names here are the ones the
//! config file uses in its `[keymap]` section.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;
use std::fmt;
use std::str::FromStr;

macro_rules! controls {
    ($($name:ident = $cc:literal),+ $(,)?) => {
        /// A named control on the nanoKONTROL2, with its controller number.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive)]
        #[repr(u8)]
        pub enum Control {
            $($name = $cc,)+
        }

        impl Control {
            /// All controls on the surface.
            pub const ALL: &'static [Control] = &[$(Control::$name,)+];

            /// The config-file name of this control.
            pub fn name(self) -> &'static str {
                match self {
                    $(Control::$name => stringify!($name),)+
                }
            }
        }
    };
}

controls! {
    PARAM1_SLIDER = 0,
    PARAM2_SLIDER = 1,
    PARAM3_SLIDER = 2,
    PARAM4_SLIDER = 3,
    PARAM5_SLIDER = 4,
    PARAM6_SLIDER = 5,
    PARAM7_SLIDER = 6,
    PARAM8_SLIDER = 7,
    PARAM1_KNOB = 16,
    PARAM2_KNOB = 17,
    PARAM3_KNOB = 18,
    PARAM4_KNOB = 19,
    PARAM5_KNOB = 20,
    PARAM6_KNOB = 21,
    PARAM7_KNOB = 22,
    PARAM8_KNOB = 23,
    PARAM1_SOLO = 32,
    PARAM2_SOLO = 33,
    PARAM3_SOLO = 34,
    PARAM4_SOLO = 35,
    PARAM5_SOLO = 36,
    PARAM6_SOLO = 37,
    PARAM7_SOLO = 38,
    PARAM8_SOLO = 39,
    PLAY = 41,
    STOP = 42,
    PREV = 43,
    NEXT = 44,
    RECORD = 45,
    CYCLE = 46,
    PARAM1_MUTE = 48,
    PARAM2_MUTE = 49,
    PARAM3_MUTE = 50,
    PARAM4_MUTE = 51,
    PARAM5_MUTE = 52,
    PARAM6_MUTE = 53,
    PARAM7_MUTE = 54,
    PARAM8_MUTE = 55,
    TRACK_PREV = 58,
    TRACK_NEXT = 59,
    MARKER_SET = 60,
    MARKER_PREV = 61,
    MARKER_NEXT = 62,
    PARAM1_RECORD = 64,
    PARAM2_RECORD = 65,
    PARAM3_RECORD = 66,
    PARAM4_RECORD = 67,
    PARAM5_RECORD = 68,
    PARAM6_RECORD = 69,
    PARAM7_RECORD = 70,
    PARAM8_RECORD = 71,
}

impl Control {
    /// Look up a control by its controller number.
    pub fn from_cc(cc: u8) -> Option<Control> {
        Control::from_u8(cc)
    }

    /// The controller number this control reports as.
    pub fn cc(self) -> u8 {
        self as u8
    }

    /// Whether the surface has an LED behind this control.
    ///
    /// Buttons are backlit; sliders and knobs are not.
    pub fn has_led(self) -> bool {
        !matches!(self.cc(), 0..=7 | 16..=23)
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Control {
    type Err = UnknownControl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Control::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownControl(s.to_string()))
    }
}

/// Error returned when a config names a control the surface doesn't have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownControl(pub String);

impl fmt::Display for UnknownControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no such control '{}'", self.0)
    }
}

impl std::error::Error for UnknownControl {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cc_roundtrip() {
        for &control in Control::ALL {
            assert_eq!(Some(control), Control::from_cc(control.cc()));
        }
    }

    #[test]
    fn unmapped_cc_is_none() {
        // 40 sits in the gap between the solo buttons and PLAY
        assert_eq!(None, Control::from_cc(40));
        assert_eq!(None, Control::from_cc(127));
    }

    #[test]
    fn parse_by_name() {
        assert_eq!(Ok(Control::PLAY), "PLAY".parse());
        assert_eq!(Ok(Control::PARAM3_SLIDER), "PARAM3_SLIDER".parse());
        // names are matched case-insensitively
        assert_eq!(Ok(Control::TRACK_PREV), "track_prev".parse());
    }

    #[test]
    fn parse_unknown_name() {
        let err = "PARAM9_SLIDER".parse::<Control>().unwrap_err();
        assert_eq!("no such control 'PARAM9_SLIDER'", err.to_string());
    }

    #[test]
    fn leds_on_buttons_only() {
        assert!(Control::PLAY.has_led());
        assert!(Control::PARAM1_MUTE.has_led());
        assert!(Control::PARAM8_RECORD.has_led());
        assert!(!Control::PARAM1_SLIDER.has_led());
        assert!(!Control::PARAM8_KNOB.has_led());
    }

    #[test]
    fn surface_is_complete() {
        // 11 transport/track/marker buttons + 5 groups of 8 channel controls
        assert_eq!(51, Control::ALL.len());
    }
}
