//! Integration tests for config loading from disk.

use nanokontroller::actions::ActionSpec;
use nanokontroller::config::Config;
use nanokontroller::controls::Control;
use std::fs;

fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("write config");
    (dir, path)
}

#[test]
fn loads_a_realistic_config() {
    let (_dir, path) = write_config(
        r#"
        [midi]
        port = "nanoKONTROL2"

        [keymap]
        PLAY = "KEY_PLAYPAUSE"
        STOP = "KEY_STOPCD"
        NEXT = "KEY_NEXTSONG"
        PREV = "KEY_PREVIOUSSONG"
        PARAM1_SLIDER = "volume/speakers/150"
        PARAM1_MUTE = "mute/speakers"
        PARAM2_SLIDER = "volume/mic"
        PARAM2_MUTE = "mute/mic"
        PARAM3_SLIDER = "volumestr/music"
        RECORD = "exec/notify-send 'key {NK_KEY_ID}' 'value {NK_KEY_VALUE}'"

        [audiooutputs]
        speakers = "alsa_output.pci-0000_00_1f.3.analog-stereo"

        [audioinputs]
        mic = "alsa_input.usb-Blue_Microphones-00.analog-stereo"

        [streams]
        music = "- YouTube Music"
        "#,
    );

    let config = Config::load(Some(&path)).expect("config should load");
    assert_eq!(10, config.keymap.len());
    assert!(config.ignored.is_empty());
    assert_eq!("nanoKONTROL2", config.port_match);
    assert_eq!(
        "alsa_output.pci-0000_00_1f.3.analog-stereo",
        config.sinks["speakers"]
    );
    assert_eq!("- YouTube Music", config.streams["music"]);

    let play = config
        .keymap
        .iter()
        .find(|e| e.control == Control::PLAY)
        .expect("PLAY should be mapped");
    assert_eq!(ActionSpec::Key(evdev::Key::KEY_PLAYPAUSE), play.action);

    let slider = config
        .keymap
        .iter()
        .find(|e| e.control == Control::PARAM1_SLIDER)
        .expect("PARAM1_SLIDER should be mapped");
    assert_eq!(
        ActionSpec::DeviceVolume {
            device: "speakers".to_string(),
            max_percent: 150.0,
        },
        slider.action
    );
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("does-not-exist.toml");
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read config file"));
}

#[test]
fn invalid_toml_is_an_error() {
    let (_dir, path) = write_config("[keymap\nPLAY = KEY_PLAYPAUSE");
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse"));
}

#[test]
fn bad_entries_survive_as_diagnostics() {
    let (_dir, path) = write_config(
        r#"
        [keymap]
        PLAY = "KEY_PLAYPAUSE"
        FADER9000 = "KEY_A"
        CYCLE = "teleport/home"
        MARKER_SET = "KEY_NOT_A_REAL_KEY"
        "#,
    );

    let config = Config::load(Some(&path)).expect("config should still load");
    assert_eq!(1, config.keymap.len());
    assert_eq!(3, config.ignored.len());

    let reasons: Vec<&str> = config.ignored.iter().map(|e| e.reason.as_str()).collect();
    assert!(reasons.iter().any(|r| r.contains("no such control")));
    assert!(reasons.iter().any(|r| r.contains("unknown action")));
    assert!(reasons.iter().any(|r| r.contains("unknown evdev key name")));
}
