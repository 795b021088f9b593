//! `strata baseline` command - mark a database as already migrated.

use crate::cli::BaselineArgs;
use crate::context::MigrationContext;
use crate::error::CliResult;
use crate::output;

/// Run the baseline command
pub async fn run(args: BaselineArgs) -> CliResult<()> {
    output::header("Baseline");

    let ctx = MigrationContext::connect(&args.connection).await?;

    output::kv("Database", &ctx.url);
    let version = args.baseline_version.as_deref();
    output::kv("Baseline version", version.unwrap_or("1"));
    output::newline();

    ctx.engine.baseline(version).await?;
    output::success("Baseline recorded. Older versioned migrations will be skipped.");

    Ok(())
}
