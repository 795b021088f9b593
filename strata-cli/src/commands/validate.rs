//! `strata validate` command - check scripts against the schema history.

use crate::cli::ValidateArgs;
use crate::context::MigrationContext;
use crate::error::CliResult;
use crate::output;

/// Run the validate command
pub async fn run(args: ValidateArgs) -> CliResult<()> {
    output::header("Validate");

    let ctx = MigrationContext::connect_with(&args.connection, |mut config| {
        config.ignore_missing = config.ignore_missing || args.ignore_missing;
        config
    })
    .await?;

    output::kv("Database", &ctx.url);
    output::kv("Locations", &ctx.locations.join(", "));
    output::newline();

    match ctx.engine.validate().await {
        Ok(()) => {
            output::success("All migrations validated successfully.");
            Ok(())
        }
        Err(err) => {
            output::error("Validation failed:");
            for line in err.to_string().lines() {
                output::list_item(line);
            }
            Err(err.into())
        }
    }
}
