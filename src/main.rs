use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cellfluid::config::Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_new(&cli.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // Tick output (`println!`) is the only thing that belongs on stdout;
    // tracing goes to stderr so piping stdout to a file reproduces the
    // original's clean tick-by-tick trace.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let grid = match cellfluid::io::read_grid(&cli.input) {
        Ok(grid) => grid,
        Err(err) => {
            tracing::error!(%err, "failed to read input grid");
            return ExitCode::from(1);
        }
    };

    match cellfluid::config::dispatch(&cli, grid) {
        Ok(()) => ExitCode::SUCCESS,
        Err(cellfluid::error::SimError::Io(cellfluid::error::IoError::CheckpointWrite {
            ..
        })) => {
            // Checkpoint-write failures exit with code 255, matching how
            // `exit(-1)` already wraps on POSIX.
            tracing::error!("checkpoint write failed");
            ExitCode::from(255)
        }
        Err(err) => {
            tracing::error!(%err, "simulation failed");
            ExitCode::from(1)
        }
    }
}
