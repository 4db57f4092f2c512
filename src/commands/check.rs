//! Check command - runs preflight checks.

use anyhow::{bail, Result};
use std::path::Path;

use crate::preflight;

/// Execute the check command.
pub fn cmd_check(
    config_path: Option<&Path>,
    port_override: Option<&str>,
    strict: bool,
) -> Result<()> {
    let report = preflight::run(config_path, port_override);
    report.print();
    if strict && !report.all_passed() {
        bail!("preflight checks failed");
    }
    Ok(())
}
