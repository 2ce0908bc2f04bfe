//! growthlog CLI entry point.

use clap::Parser;
use growthlog::cli::commands;
use growthlog::cli::{Cli, Commands, OutputFormat};
use growthlog::error::Error;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.silent {
        growthlog::SILENT.store(true, Ordering::Relaxed);
    }
    if cli.dry_run {
        growthlog::DRY_RUN.store(true, Ordering::Relaxed);
    }
    if cli.format == OutputFormat::Csv {
        growthlog::CSV_OUTPUT.store(true, Ordering::Relaxed);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR --format json OR non-TTY stdout
    let json = cli.json
        || cli.format == OutputFormat::Json
        || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    let actor = cli.actor.as_deref();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, *force, json),
        Commands::Version => commands::version::execute(json),
        Commands::Child { command } => commands::child::execute(command, db, actor, json),
        Commands::Record { command } => commands::record::execute(command, db, actor, json),
        Commands::Csv { command } => commands::csv::execute(command, db, actor, json),
        Commands::Sync { command } => commands::sync::execute(command, db, actor, json),
        Commands::Status => commands::status::execute(db, json),
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
