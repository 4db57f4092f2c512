//! Integration tests for binding the keymap against audio-state snapshots.

use nanokontroller::config::Config;
use nanokontroller::controls::Control;
use nanokontroller::keymap::{ActionMap, Binding};
use nanokontroller::pulse::{DeviceInfo, DeviceKind, StreamInfo};
use std::path::PathBuf;

fn parse(content: &str) -> Config {
    Config::parse(content, PathBuf::from("test.toml")).expect("config should parse")
}

fn speakers() -> DeviceInfo {
    DeviceInfo {
        kind: DeviceKind::Sink,
        index: 3,
        name: "alsa_output.pci-0000_00_1f.3.analog-stereo".to_string(),
        description: "Built-in Audio Analog Stereo".to_string(),
        channels: 2,
        mute: false,
    }
}

fn mic() -> DeviceInfo {
    DeviceInfo {
        kind: DeviceKind::Source,
        index: 7,
        name: "alsa_input.usb-Blue_Microphones-00.analog-stereo".to_string(),
        description: "Blue Microphones".to_string(),
        channels: 1,
        mute: true,
    }
}

fn music_stream() -> StreamInfo {
    StreamInfo {
        index: 42,
        name: "Playback - YouTube Music".to_string(),
        channels: 2,
    }
}

const FULL_CONFIG: &str = r#"
    [keymap]
    PLAY = "KEY_PLAYPAUSE"
    PARAM1_SLIDER = "volume/speakers/150"
    PARAM1_MUTE = "mute/mic"
    PARAM3_SLIDER = "volumestr/music"
    RECORD = "exec/systemctl suspend"

    [audiooutputs]
    speakers = "alsa_output.pci-0000_00_1f.3.analog-stereo"

    [audioinputs]
    mic = "alsa_input.usb-Blue_Microphones-00.analog-stereo"

    [streams]
    music = "- YouTube Music"
"#;

#[test]
fn binds_every_action_kind() {
    let config = parse(FULL_CONFIG);
    let map = ActionMap::build(&config, &[speakers(), mic()], &[music_stream()]);
    assert_eq!(5, map.len());
    assert!(map.needs_keyboard());

    match map.get(Control::PLAY.cc()) {
        Some(Binding::Key { key }) => assert_eq!(evdev::Key::KEY_PLAYPAUSE, *key),
        other => panic!("expected key binding, got {other:?}"),
    }

    match map.get(Control::PARAM1_SLIDER.cc()) {
        Some(Binding::DeviceVolume {
            device,
            max_percent,
        }) => {
            assert_eq!(DeviceKind::Sink, device.kind);
            assert_eq!(3, device.index);
            assert_eq!(2, device.channels);
            assert_eq!(150.0, *max_percent);
        }
        other => panic!("expected device volume binding, got {other:?}"),
    }

    match map.get(Control::PARAM3_SLIDER.cc()) {
        Some(Binding::StreamVolume { target, .. }) => {
            let target = target.expect("stream should have resolved");
            assert_eq!(42, target.index);
        }
        other => panic!("expected stream volume binding, got {other:?}"),
    }
}

#[test]
fn mute_binding_seeds_state_from_device() {
    let config = parse(FULL_CONFIG);
    let map = ActionMap::build(&config, &[speakers(), mic()], &[]);
    match map.get(Control::PARAM1_MUTE.cc()) {
        Some(Binding::Mute { device, muted }) => {
            assert_eq!(DeviceKind::Source, device.kind);
            // mic() reports muted; the toggle must start from that.
            assert!(*muted);
        }
        other => panic!("expected mute binding, got {other:?}"),
    }
}

#[test]
fn unresolved_device_is_skipped() {
    let config = parse(
        r#"
        [keymap]
        PARAM1_SLIDER = "volume/speakers"
        PLAY = "KEY_PLAYPAUSE"

        [audiooutputs]
        speakers = "alsa_output.pci-0000_00_1f.3.analog-stereo"
        "#,
    );
    // No devices present at all: the volume entry drops, the key stays.
    let map = ActionMap::build(&config, &[], &[]);
    assert_eq!(1, map.len());
    assert!(map.get(Control::PARAM1_SLIDER.cc()).is_none());

    let missing = ActionMap::unresolved(&config, &[]);
    assert_eq!(vec!["speakers".to_string()], missing);
}

#[test]
fn alias_without_config_section_is_skipped() {
    let config = parse(
        r#"
        [keymap]
        PARAM1_MUTE = "mute/phantom"
        "#,
    );
    let map = ActionMap::build(&config, &[speakers()], &[]);
    assert!(map.is_empty());
}

#[test]
fn absent_stream_binds_unresolved_and_rebinds_later() {
    let config = parse(FULL_CONFIG);
    let mut map = ActionMap::build(&config, &[speakers(), mic()], &[]);

    match map.get(Control::PARAM3_SLIDER.cc()) {
        Some(Binding::StreamVolume { target, .. }) => assert!(target.is_none()),
        other => panic!("expected stream volume binding, got {other:?}"),
    }

    // The application starts playing; a rebind picks it up.
    map.rebind_streams(&[music_stream()]);
    match map.get(Control::PARAM3_SLIDER.cc()) {
        Some(Binding::StreamVolume { target, .. }) => {
            assert_eq!(42, target.expect("should resolve now").index);
        }
        other => panic!("expected stream volume binding, got {other:?}"),
    }

    // And it disappears again.
    map.rebind_streams(&[]);
    match map.get(Control::PARAM3_SLIDER.cc()) {
        Some(Binding::StreamVolume { target, .. }) => assert!(target.is_none()),
        other => panic!("expected stream volume binding, got {other:?}"),
    }
}

#[test]
fn stream_matches_by_suffix_only() {
    let config = parse(FULL_CONFIG);
    let other = StreamInfo {
        index: 9,
        name: "YouTube Music - something else".to_string(),
        channels: 2,
    };
    let map = ActionMap::build(&config, &[speakers(), mic()], &[other]);
    match map.get(Control::PARAM3_SLIDER.cc()) {
        Some(Binding::StreamVolume { target, .. }) => assert!(target.is_none()),
        other => panic!("expected stream volume binding, got {other:?}"),
    }
}
