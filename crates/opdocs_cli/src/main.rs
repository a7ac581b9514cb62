//! `opdocs` command-line entry point.
//!
//! # Responsibility
//! - Bootstrap configuration and logging, then run one subcommand against OpenProject.
//! - Drive outline conversion from a Markdown file through the in-memory editing surface.
//!
//! Usage:
//!   opdocs --config op.json convert plan.md --root 2 --output plan.linked.md
//!   opdocs rename 42 "New subject" --lock-version 3
//!   opdocs link plan.md --block 4 17

use clap::{Parser, Subcommand};
use log::error;
use opdocs_core::{
    convert_outline_to_tasks, default_log_level, init_logging, parse_outline, render_outline,
    BlockKind, BlockSnapshot, FeatureService, HttpWorkPackageClient, LogNotifier, LoggingConfig,
    MemoryDocument, Notifier, OpenProjectConfig, SaveProtocol, SaveResult, Severity,
    SyncedDocument, SystemClock, WorkPackageClient,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult = Result<(), Box<dyn Error>>;

/// Turn document outlines into OpenProject work packages.
#[derive(Parser, Debug)]
#[command(name = "opdocs", version)]
struct Cli {
    /// JSON config file; defaults plus OPEN_PROJECT_* environment when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; stderr when omitted
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert the outline rooted at one list item into parent/child tasks
    Convert {
        outline: PathBuf,
        /// Block index of the root item; first list item when omitted
        #[arg(long)]
        root: Option<usize>,
        /// Write the linked outline here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Turn one block of an outline into a reference to an existing work package
    Link {
        outline: PathBuf,
        /// Block index to replace
        #[arg(long)]
        block: usize,
        work_package: String,
        /// Write the updated outline here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print one work package as JSON
    Show { id: String },
    /// Change a work package subject using its lock version
    Rename {
        id: String,
        subject: String,
        #[arg(long)]
        lock_version: i64,
    },
    /// List available statuses
    Statuses,
    /// List projects
    Projects,
    /// List work-package types of a project
    Types { project: String },
    /// Typeahead search over work packages
    Search { query: String },
    /// Create a feature in the configured feature project
    Feature {
        subject: String,
        /// Markdown description
        #[arg(long)]
        description: Option<String>,
    },
}

/// Logs notifications and echoes them to stderr.
struct ConsoleNotifier {
    log: LogNotifier,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.log.notify(message, severity);
        eprintln!("[{}] {message}", severity.as_str());
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().to_string()),
        log_dir: cli.log_dir.clone(),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult {
    let config = match &cli.config {
        Some(path) => OpenProjectConfig::load(path)?,
        None => OpenProjectConfig::from_env()?,
    };
    let client = HttpWorkPackageClient::new(config.clone())?;

    match cli.command {
        Command::Convert {
            outline,
            root,
            output,
        } => convert(client, config, &outline, root, output),
        Command::Link {
            outline,
            block,
            work_package,
            output,
        } => link(client, config, &outline, block, &work_package, output),
        Command::Show { id } => {
            let wp = client.get_work_package(&id)?;
            println!("{}", serde_json::to_string_pretty(&wp)?);
            Ok(())
        }
        Command::Rename {
            id,
            subject,
            lock_version,
        } => {
            let protocol = SaveProtocol::new(client, config);
            match protocol.update_subject(&id, &subject, Some(lock_version)) {
                SaveResult::Updated { lock_version } => {
                    println!("updated #{id} lock_version={lock_version}");
                    Ok(())
                }
                SaveResult::Conflict => Err(opdocs_core::notify::CONFLICT_MESSAGE.into()),
                SaveResult::Failed(failure) => Err(failure.into()),
                SaveResult::Created { id, .. } => Err(format!("unexpected creation of #{id}").into()),
            }
        }
        Command::Statuses => {
            for status in client.list_statuses()? {
                let closed = if status.is_closed { " (closed)" } else { "" };
                println!("{}\t{}{closed}", status.id, status.name);
            }
            Ok(())
        }
        Command::Projects => {
            for project in client.list_projects()? {
                println!("{}\t{}", project.id, project.name);
            }
            Ok(())
        }
        Command::Types { project } => {
            for wp_type in client.list_project_types(&project)? {
                println!("{}\t{}", wp_type.id, wp_type.name);
            }
            Ok(())
        }
        Command::Search { query } => {
            for wp in client.search_work_packages(&query)? {
                let status = wp.status.map(|status| status.name).unwrap_or_default();
                println!("#{}\t{}\t{status}", wp.id, wp.subject);
            }
            Ok(())
        }
        Command::Feature {
            subject,
            description,
        } => {
            let service = FeatureService::new(client, config);
            let created = service.create_feature(&subject, description.as_deref())?;
            println!("created feature #{} {}", created.id, created.subject);
            Ok(())
        }
    }
}

fn convert(
    client: HttpWorkPackageClient,
    config: OpenProjectConfig,
    outline: &Path,
    root: Option<usize>,
    output: Option<PathBuf>,
) -> CliResult {
    let blocks = read_outline(outline)?;

    let root_index = match root {
        Some(index) => index,
        None => blocks
            .iter()
            .position(|block| block.kind.is_outline())
            .ok_or("outline contains no list items")?,
    };
    let root_block = blocks
        .get(root_index)
        .ok_or_else(|| format!("root index {root_index} out of range ({} blocks)", blocks.len()))?;
    if root_block.kind == BlockKind::Task {
        return Err(format!("block {root_index} is already a task").into());
    }
    let root_id = root_block.id;

    let policy = config.poll_policy();
    let doc = SyncedDocument::new(
        MemoryDocument::from_blocks(blocks),
        SaveProtocol::new(client, config),
        console(),
    );
    let report = convert_outline_to_tasks(&doc, &SystemClock, policy, root_id)?;

    eprintln!(
        "created={} skipped_blank={} abandoned={}",
        report.created_count(),
        report.skipped_blank.len(),
        report.abandoned.len()
    );

    write_outline(&doc.into_inner().snapshots(), output)?;

    if report.is_complete() {
        Ok(())
    } else {
        Err(format!("{} subtree(s) were not created", report.abandoned.len()).into())
    }
}

fn link(
    client: HttpWorkPackageClient,
    config: OpenProjectConfig,
    outline: &Path,
    block: usize,
    work_package: &str,
    output: Option<PathBuf>,
) -> CliResult {
    let blocks = read_outline(outline)?;
    let block_id = blocks
        .get(block)
        .map(|snapshot| snapshot.id)
        .ok_or_else(|| format!("block index {block} out of range ({} blocks)", blocks.len()))?;

    let doc = SyncedDocument::new(
        MemoryDocument::from_blocks(blocks),
        SaveProtocol::new(client, config),
        console(),
    );
    let props = doc.link_work_package(block_id, work_package)?;
    eprintln!(
        "linked block {block} to #{} {}",
        props.work_package_id.as_deref().unwrap_or(work_package),
        props.subject
    );

    write_outline(&doc.into_inner().snapshots(), output)
}

fn console() -> ConsoleNotifier {
    ConsoleNotifier { log: LogNotifier }
}

fn read_outline(path: &Path) -> Result<Vec<BlockSnapshot>, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read `{}`: {err}", path.display()))?;
    Ok(parse_outline(&text)?)
}

fn write_outline(blocks: &[BlockSnapshot], output: Option<PathBuf>) -> CliResult {
    let rendered = render_outline(blocks);
    match output {
        Some(path) => std::fs::write(&path, rendered)
            .map_err(|err| format!("failed to write `{}`: {err}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_convert_with_global_flags() {
        let cli = Cli::try_parse_from([
            "opdocs",
            "convert",
            "plan.md",
            "--root",
            "2",
            "--log-level",
            "warn",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("warn"));
        match cli.command {
            Command::Convert { outline, root, output } => {
                assert_eq!(outline.to_str(), Some("plan.md"));
                assert_eq!(root, Some(2));
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_link_with_block_index() {
        let cli =
            Cli::try_parse_from(["opdocs", "link", "plan.md", "--block", "4", "17"]).unwrap();
        match cli.command {
            Command::Link {
                block,
                work_package,
                ..
            } => {
                assert_eq!(block, 4);
                assert_eq!(work_package, "17");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rename_requires_lock_version() {
        assert!(Cli::try_parse_from(["opdocs", "rename", "42", "New"]).is_err());
        let cli =
            Cli::try_parse_from(["opdocs", "rename", "42", "New", "--lock-version", "3"]).unwrap();
        assert!(matches!(cli.command, Command::Rename { lock_version: 3, .. }));
    }
}
