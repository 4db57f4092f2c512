//! nanokontroller - maps a Korg nanoKONTROL2 to Linux desktop actions.
//!
//! Buttons, sliders and knobs on the control surface become synthetic key
//! presses (uinput), PulseAudio volume/mute changes, per-application stream
//! volume, or shell commands, as declared in the config file. Button LEDs
//! mirror the state they control.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use nanokontroller::commands::{self, list::ListTarget, show::ShowTarget};
use nanokontroller::config::Config;

#[derive(Parser)]
#[command(name = "nanokontroller")]
#[command(about = "Maps a Korg nanoKONTROL2 control surface to desktop actions")]
#[command(
    after_help = "QUICK START:\n  nanokontroller check         Verify device, uinput and PulseAudio\n  nanokontroller list devices  Find PulseAudio device names for the config\n  nanokontroller               Start the daemon"
)]
struct Cli {
    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to config file (default: ~/.config/nanokontroller/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// MIDI port name substring to connect to
    #[arg(long, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon (the default when no command is given)
    Run,

    /// List MIDI ports, audio devices or streams
    List {
        #[command(subcommand)]
        what: ListWhat,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowWhat,
    },

    /// Run preflight checks (verify the device and backends before running)
    Check {
        /// Fail with exit code 1 if any check fails
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum ListWhat {
    /// MIDI input and output ports
    Ports,
    /// PulseAudio outputs (sinks) and inputs (sources)
    Devices,
    /// PulseAudio application playback streams
    Streams,
}

#[derive(Subcommand)]
enum ShowWhat {
    /// Show the resolved configuration
    Config,
    /// Show the bound control -> action table
    Keymap,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = Config::load(cli.config.as_deref())?;
            commands::cmd_run(&config, cli.port.as_deref())?;
        }

        Commands::List { what } => {
            let target = match what {
                ListWhat::Ports => ListTarget::Ports,
                ListWhat::Devices => ListTarget::Devices,
                ListWhat::Streams => ListTarget::Streams,
            };
            commands::cmd_list(target)?;
        }

        Commands::Show { what } => {
            let config = Config::load(cli.config.as_deref())?;
            let target = match what {
                ShowWhat::Config => ShowTarget::Config,
                ShowWhat::Keymap => ShowTarget::Keymap,
            };
            commands::cmd_show(&config, target)?;
        }

        Commands::Check { strict } => {
            commands::cmd_check(cli.config.as_deref(), cli.port.as_deref(), strict)?;
        }
    }

    Ok(())
}
