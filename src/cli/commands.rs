//! Command dispatch

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::RunReport;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::TreeBuilder;
use crate::exitcode;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::RowSource;
use crate::infrastructure::{CsvRowSource, InMemoryStore, InfraError};
use crate::tree_traits::TreeNodeConvert;

/// Run the selected command and return the process exit code.
pub fn execute_command(cli: &Cli) -> CliResult<i32> {
    match &cli.command {
        Some(Commands::Import { source, dry_run }) => cmd_import(cli, source, *dry_run),
        Some(Commands::Tree) => cmd_tree(cli),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(exitcode::OK)
        }
        None => Err(CliError::InvalidArgs(
            "no command given, see --help".to_string(),
        )),
    }
}

/// Load settings for `source_dir` and apply the `--store` override.
fn load_settings(cli: &Cli, source_dir: Option<&Path>) -> CliResult<Settings> {
    let mut settings = Settings::load(source_dir)?;
    if let Some(store) = &cli.store {
        settings.store_path = store.clone();
    }
    debug!("store: {}", settings.store_path.display());
    Ok(settings)
}

#[instrument(level = "debug", skip(cli))]
fn cmd_import(cli: &Cli, source: &Path, dry_run: bool) -> CliResult<i32> {
    if !source.is_file() {
        return Err(InfraError::Source {
            path: source.to_path_buf(),
            message: "no such file".to_string(),
        }
        .into());
    }
    let settings = load_settings(cli, source.parent())?;
    let columns = settings
        .columns
        .to_column_map()
        .map_err(ApplicationError::from)?;
    let rows = CsvRowSource::new(source, columns, settings.has_headers)
        .read_rows()
        .map_err(|e| InfraError::Source {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;

    let container = ServiceContainer::new(settings)?;
    let coordinator = if dry_run {
        let copy = InMemoryStore::copy_of(container.store.as_ref())
            .map_err(|e| InfraError::io("copy store for dry run", e))?;
        container.coordinator_for(Arc::new(copy))?
    } else {
        container.coordinator()?
    };

    let report = coordinator.run(&rows)?;
    if dry_run {
        print_plan(&report);
    }
    print_report(&report, dry_run);

    if report.has_failures() {
        Ok(exitcode::PARTIAL)
    } else {
        Ok(exitcode::OK)
    }
}

fn print_plan(report: &RunReport) {
    output::header("Planned changes (dry run):");
    for intent in report.intents() {
        if intent.is_create() {
            output::planned_create(intent);
        } else {
            output::planned_update(intent);
        }
    }
}

fn print_report(report: &RunReport, dry_run: bool) {
    let summary = &report.summary;
    let merge = &report.merge;
    if dry_run {
        output::info(&format!("Would create {} categories.", summary.created));
        output::info(&format!("Would update {} categories.", summary.updated));
    } else {
        output::success(&format!("Created {} categories.", summary.created));
        output::success(&format!("Updated {} categories.", summary.updated));
    }
    output::action(
        "tree",
        &format!(
            "{} groups created, {} nodes created, {} nodes updated",
            merge.groups_created(),
            merge.nodes_created(),
            merge.nodes_updated()
        ),
    );

    if summary.failed > 0 {
        output::warning(&format!("{} categories failed to upload", summary.failed));
    }
    for failure in &merge.failures {
        output::failure(&format!(
            "{} '{}': {}",
            failure.operation, failure.label, failure.message
        ));
    }
}

fn cmd_tree(cli: &Cli) -> CliResult<i32> {
    let settings = load_settings(cli, None)?;
    let container = ServiceContainer::new(settings)?;
    let persisted = container.coordinator()?.load_persisted_state()?;
    if persisted.is_empty() {
        output::warning("store holds no category tree yet");
        return Ok(exitcode::OK);
    }
    let tree = TreeBuilder::from_persisted(&persisted);
    output::info(&tree.to_tree_string());
    let categories: usize = tree.iter().map(|(_, node)| node.identifiers.len()).sum();
    output::action(
        "tree",
        &format!(
            "{} groups, {} levels, {} category references",
            tree.len() - 1,
            tree.depth(),
            categories
        ),
    );
    Ok(exitcode::OK)
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<i32> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli, None)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => {
                    let state = if path.exists() { "" } else { " (not found)" };
                    output::action("global", &format!("{}{}", path.display(), state));
                }
                None => output::warning("no config directory available"),
            }
            let local = local_config_path(Path::new("<source_dir>"));
            output::action("local", &format!("{} (next to the imported sheet)", local.display()));
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(exitcode::OK)
}

/// Report an error to the user; returns its exit code.
pub fn report_error(err: &CliError) -> i32 {
    output::error(err);
    err.exit_code()
}
