//! cellnote - annotate the selected spreadsheet cell from the command line.
//!
//! The bundled host is the simulated workbook loaded from a JSON fixture.

mod config;
mod logging;
mod sink;
mod trigger;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use cellnote_core::impls::{HostFixture, SimulatedHost, TemplateContentSource};
use cellnote_core::{AppBuilder, Task};

use crate::sink::StdoutSink;

#[derive(Parser)]
#[command(name = "cellnote", version, about = "Annotate spreadsheet cells with fetched insights")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format: text or json (overrides config)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read triggers from stdin until `quit` or end of input
    Run {
        #[arg(long)]
        workbook: PathBuf,
    },
    /// Run one health check and exit
    Health {
        #[arg(long)]
        workbook: PathBuf,
    },
}

fn load_fixture(path: &Path) -> Result<HostFixture> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading workbook fixture {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing workbook fixture {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(level) = cli.log_level {
        cfg.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        cfg.logging.format = format;
    }
    logging::init_logging(&cfg.logging)?;

    let (workbook, interactive) = match &cli.command {
        Command::Run { workbook } => (workbook, true),
        Command::Health { workbook } => (workbook, false),
    };
    let host = SimulatedHost::from_fixture(&load_fixture(workbook)?);

    let worker_host = host.clone();
    let app = AppBuilder::new()
        .settings(cfg.settings())
        .host(move || Box::new(worker_host))
        .content(TemplateContentSource::default())
        .sink(Arc::new(StdoutSink))
        .build()?
        .spawn()?;

    if interactive {
        let submitted = trigger::run(std::io::stdin().lock(), &app)?;
        info!(submitted, "trigger input closed");
    } else {
        app.submit(Task::health_check())?;
        app.quit()?;
    }

    let summary = app.join()?;
    info!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        discarded = summary.discarded,
        "done"
    );

    if interactive {
        for (document, sheet, cell, text) in host.dump_annotations() {
            println!("[{document}]{sheet}!{cell}");
            for line in text.lines() {
                println!("  {line}");
            }
        }
    }
    Ok(())
}
