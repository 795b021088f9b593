//! `strata info` command - show migration status.

use strata_migrate::MigrationState;

use crate::cli::InfoArgs;
use crate::context::MigrationContext;
use crate::error::CliResult;
use crate::output;

/// Run the info command
pub async fn run(args: InfoArgs) -> CliResult<()> {
    output::header("Migration Info");

    let ctx = MigrationContext::connect(&args.connection).await?;

    output::kv("Database", &ctx.url);
    output::kv("Locations", &ctx.locations.join(", "));
    output::newline();

    let infos = ctx.engine.info().await?;
    if infos.is_empty() {
        output::info("No migrations found.");
        return Ok(());
    }

    println!(
        "  {:<10} {:<32} {:<10} {}",
        "Version", "Description", "State", "Installed on"
    );
    output::dim(&format!("  {}", "─".repeat(78)));

    for info in &infos {
        let version = info
            .version
            .as_ref()
            .map_or_else(|| "-".to_string(), |v| v.to_string());
        let state = style_state(info.state);
        let installed = info
            .installed_on
            .map_or_else(String::new, |t| t.format("%Y-%m-%d %H:%M:%S").to_string());

        println!(
            "  {:<10} {:<32} {:<19} {}",
            version,
            truncate(&info.description, 30),
            state,
            installed
        );
    }
    output::newline();

    Ok(())
}

fn style_state(state: MigrationState) -> String {
    let label = state.as_str();
    match state {
        MigrationState::Success => output::style_success(label),
        MigrationState::Pending | MigrationState::Outdated => output::style_pending(label),
        MigrationState::Failed | MigrationState::Missing => output::style_error(label),
        MigrationState::Ignored => output::style_dim(label),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
