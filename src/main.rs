use anyhow::{Context, Result};
use cfgscan::batch::{BatchMode, BatchReport, BatchRunner};
use cfgscan::cli::{Cli, Commands, RunArgs};
use cfgscan::config::{load_settings, Settings};
use cfgscan::engine::DiagnosticSink;
use cfgscan::io::{JsonSink, OutputFormat, SourceWalker, TextSink};
use cfgscan::observability::{init_tracing, install_panic_hook};
use cfgscan::progress::{ProgressConfig, ProgressManager};
use clap::Parser;
use std::process::ExitCode;
use tracing::info;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbosity);
    install_panic_hook();

    let mut settings =
        load_settings(cli.config.as_deref()).context("Failed to load cfgscan settings")?;
    settings.quiet |= cli.quiet;

    match &cli.command {
        Commands::Check(args) => run(&cli, args, settings, BatchMode::Check),
        Commands::Analyze(args) => run(&cli, args, settings, BatchMode::Analyze),
        Commands::Catalog { unused_function } => {
            settings.unused_function |= *unused_function;
            BatchRunner::new(settings, create_sink(&cli))
                .catalog()
                .context("Failed to build the check catalog")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn create_sink(cli: &Cli) -> Box<dyn DiagnosticSink> {
    match cli.format {
        OutputFormat::Text => Box::new(TextSink::new(
            std::io::stdout(),
            std::io::stderr(),
            cli.color.should_use_color(),
        )),
        OutputFormat::Json => Box::new(JsonSink::new(std::io::stdout())),
    }
}

fn run(cli: &Cli, args: &RunArgs, mut settings: Settings, mode: BatchMode) -> Result<ExitCode> {
    args.apply(&mut settings);
    settings.validate().context("Invalid settings")?;

    let files = SourceWalker::new(args.paths.clone())
        .with_ignore_patterns(&args.ignore)?
        .walk()
        .context("Failed to collect source files")?;
    info!("Analysing {} files", files.len());

    let manager = ProgressManager::new(ProgressConfig::from_env(settings.quiet, cli.verbosity));
    let bar = manager.create_bar(files.len() as u64, "Checking");
    let report = BatchRunner::new(settings, create_sink(cli))
        .progress(bar)
        .run(&files, mode)?;

    log_report(&report);
    let failed = match mode {
        BatchMode::Check => report.errors > 0,
        BatchMode::Analyze => report.failed_files > 0,
    };
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn log_report(report: &BatchReport) {
    info!(
        files = report.files,
        errors = report.errors,
        failed = report.failed_files,
        cancelled = report.cancelled,
        "Analysis complete"
    );
    for header in &report.large_headers {
        info!("Large header: {}", header.display());
    }
}
