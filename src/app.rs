//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads and validates the configuration
//! - builds the yield table (FRED or manual values)
//! - prints reports/plots or hands over to the TUI
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::pipeline::RunSettings;
use crate::cli::{Command, RunArgs, TableArgs};
use crate::config::DashboardConfig;
use crate::domain::LookupPolicy;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `ry` binary.
pub fn run() -> Result<(), AppError> {
    // We want `ry` and `ry --as-of ...` to behave like `ry tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Table(args) => handle_table(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn handle_table(args: TableArgs) -> Result<(), AppError> {
    init_logging();

    let (config, settings) = load_run(&args.run)?;
    let run = pipeline::run_table(&config, &settings)?;

    if args.json {
        println!("{}", crate::io::table_json_string(&run)?);
    } else {
        println!("{}", crate::report::format_run_summary(&run));
        print!("{}", crate::report::format_table(&run.table));

        let diagnostics = crate::report::format_diagnostics(&run.table);
        if !diagnostics.is_empty() {
            println!();
            print!("{diagnostics}");
        }

        if !args.no_plot {
            println!();
            print!(
                "{}",
                crate::plot::render_ascii_plot(&run.table, args.width, args.height)
            );
        }
    }

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::write_table_csv(path, &run.table)?;
    }
    if let Some(path) = &args.export_json {
        crate::io::write_table_json(path, &run)?;
    }

    Ok(())
}

fn handle_tui(args: RunArgs) -> Result<(), AppError> {
    // No stderr subscriber here: log lines would land on the alternate screen.
    let (config, settings) = load_run(&args)?;
    crate::tui::run(config, settings)
}

/// Load the configuration and layer CLI overrides on top.
pub fn load_run(args: &RunArgs) -> Result<(DashboardConfig, RunSettings), AppError> {
    let config = DashboardConfig::load(args.config.as_deref())?;
    let mut settings = RunSettings::from_config(&config);
    apply_overrides(&mut settings, args);
    Ok((config, settings))
}

fn apply_overrides(settings: &mut RunSettings, args: &RunArgs) {
    if let Some(as_of) = args.as_of {
        settings.as_of = as_of;
    }
    if let Some(kind) = args.policy {
        settings.policy = LookupPolicy::from_kind(kind, settings.policy.max_days());
    }
    if let Some(max_days) = args.max_days {
        settings.policy = settings.policy.with_max_days(max_days);
    }
    settings.parallel |= args.parallel;
}

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Rewrite argv so `ry` defaults to `ry tui`.
///
/// Rules:
/// - `ry`                      -> `ry tui`
/// - `ry --as-of 2025-03-21`   -> `ry tui --as-of 2025-03-21`
/// - `ry --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "table" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::PolicyKind;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_tui() {
        assert_eq!(rewrite_args(args(&["ry"])), args(&["ry", "tui"]));
        assert_eq!(
            rewrite_args(args(&["ry", "--as-of", "2025-03-21"])),
            args(&["ry", "tui", "--as-of", "2025-03-21"])
        );
        assert_eq!(rewrite_args(args(&["ry", "table"])), args(&["ry", "table"]));
        assert_eq!(rewrite_args(args(&["ry", "--help"])), args(&["ry", "--help"]));
    }

    #[test]
    fn overrides_replace_config_settings() {
        let mut settings = RunSettings {
            as_of: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            policy: LookupPolicy::OnOrBefore { max_days: 7 },
            parallel: false,
        };
        let run_args = RunArgs {
            config: None,
            as_of: NaiveDate::from_ymd_opt(2025, 3, 24),
            policy: Some(PolicyKind::Nearest),
            max_days: Some(2),
            parallel: true,
        };
        apply_overrides(&mut settings, &run_args);

        assert_eq!(settings.as_of, NaiveDate::from_ymd_opt(2025, 3, 24).unwrap());
        assert_eq!(settings.policy, LookupPolicy::Nearest { max_days: 2 });
        assert!(settings.parallel);
    }
}
