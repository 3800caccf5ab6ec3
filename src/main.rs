use anyhow::Context;
use clap::Parser;
use colored::*;
use std::path::Path;
use std::time::Instant;

use hamlint_lib::config::{Config, create_default_config};
use hamlint_lib::exit_codes::{self, exit};
use hamlint_lib::file_processor::{FileOutcome, find_haml_files, process_file};
use hamlint_lib::output::{OutputFormat, OutputWriter, format_all_warnings_as_json};
use hamlint_lib::parallel::{FileParallelProcessor, ParallelConfig};
use hamlint_lib::ruby_tool::RubyToolProcessor;

mod cli_types;

use cli_types::{CheckArgs, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Check(args) if args.verbose);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "warn" }))
        .format_timestamp(None)
        .init();

    let result = match &cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Init { path } => run_init(path),
    };

    match result {
        Ok(exit_codes::SUCCESS) => exit::success(),
        Ok(exit_codes::VIOLATIONS_FOUND) => exit::violations_found(),
        Ok(_) => exit::tool_error(),
        Err(e) => {
            eprintln!("{}: {e:#}", "Error".red().bold());
            exit::tool_error();
        }
    }
}

fn run_init(path: &str) -> anyhow::Result<i32> {
    create_default_config(path)?;
    println!("Created default configuration file: {path}");
    Ok(exit_codes::SUCCESS)
}

fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    let start = Instant::now();

    let (mut config, config_path) = Config::load(args.config.as_deref().map(Path::new))?;
    if let Some(path) = &config_path {
        log::debug!("using config {}", path.display());
    }
    if let Some(exclude) = &args.exclude {
        config.global.exclude = exclude
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
    }
    if let Some(respect) = args.respect_gitignore {
        config.global.respect_gitignore = respect;
    }

    let files = find_haml_files(&args.paths, &config.global).context("Failed to collect templates")?;
    let format: OutputFormat = args.output_format.parse().map_err(anyhow::Error::msg)?;
    let writer = OutputWriter::new(false);

    if files.is_empty() {
        if format == OutputFormat::Json {
            writer.writeln("[]")?;
        } else if !args.quiet {
            writer.writeln("No HAML files found")?;
        }
        return Ok(exit_codes::SUCCESS);
    }
    log::debug!("linting {} templates", files.len());

    let processor = RubyToolProcessor::new(&config.ruby_tool, &config.extraction);
    let parallel = FileParallelProcessor::new(ParallelConfig {
        enabled: !args.no_parallel && ParallelConfig::default().enabled,
        ..Default::default()
    });
    let outcomes = parallel.process_files(&files, |path| process_file(path, &processor, args.fix));

    report(&outcomes, format, args, &writer, start.elapsed().as_millis() as u64)?;

    let code = if outcomes.iter().any(|o| o.error.is_some()) {
        exit_codes::TOOL_ERROR
    } else if outcomes.iter().any(|o| !o.warnings.is_empty()) {
        exit_codes::VIOLATIONS_FOUND
    } else {
        exit_codes::SUCCESS
    };
    Ok(code)
}

fn report(
    outcomes: &[FileOutcome],
    format: OutputFormat,
    args: &CheckArgs,
    writer: &OutputWriter,
    duration_ms: u64,
) -> anyhow::Result<()> {
    let formatter = format.create_formatter(colored::control::SHOULD_COLORIZE.should_colorize());

    for outcome in outcomes {
        if let Some(error) = &outcome.error {
            writer.write_error(&format!("{}: {}: {error}", "error".red().bold(), outcome.path))?;
        }
        if outcome.fixed && !args.quiet && format == OutputFormat::Text {
            writer.writeln(&format!("{}: {}", "Fixed".green(), outcome.path))?;
        }
        writer.writeln(&formatter.format_warnings(&outcome.warnings, &outcome.path))?;
    }

    if format == OutputFormat::Json {
        let all: Vec<(String, Vec<_>)> = outcomes
            .iter()
            .map(|o| (o.path.clone(), o.warnings.clone()))
            .collect();
        writer.writeln(&format_all_warnings_as_json(&all))?;
    } else if !args.quiet {
        let total_warnings = outcomes.iter().map(|o| o.warnings.len()).sum();
        if let Some(summary) = formatter.format_summary(outcomes.len(), total_warnings, duration_ms) {
            writer.writeln(&summary)?;
        }
    }

    Ok(())
}
