//! `strata migrate` command - apply pending migrations.

use crate::cli::MigrateArgs;
use crate::context::MigrationContext;
use crate::error::CliResult;
use crate::output;

/// Run the migrate command
pub async fn run(args: MigrateArgs) -> CliResult<()> {
    output::header("Migrate");

    let ctx = MigrationContext::connect_with(&args.connection, |mut config| {
        config.out_of_order = config.out_of_order || args.out_of_order;
        config.validate_on_migrate = config.validate_on_migrate && !args.skip_validation;
        config
    })
    .await?;

    output::kv("Database", &ctx.url);
    output::kv("Locations", &ctx.locations.join(", "));
    output::newline();

    let outcome = ctx.engine.migrate().await?;

    if outcome.migrations_applied == 0 {
        output::info("Schema is up to date. No migrations applied.");
    } else {
        output::success(&format!(
            "Applied {} migration{}.",
            outcome.migrations_applied,
            if outcome.migrations_applied == 1 { "" } else { "s" }
        ));
    }
    if let Some(version) = outcome.current_version {
        output::kv("Current version", &version.to_string());
    }

    Ok(())
}
