//! `strata version` command - display version information.

use crate::error::CliResult;
use crate::output;

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("Strata");
    output::kv("Version", env!("CARGO_PKG_VERSION"));
    output::kv("Engine", "strata-migrate");
    output::kv("Bundled driver", "sqlite");
    output::newline();
    Ok(())
}
