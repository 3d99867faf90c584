use anyhow::Result;
use clap::Parser;

use osm_shape::app::{Cli, RunMode, mode_label, resolve_runtime, run_audit, run_shaping};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = resolve_runtime(&cli)?;
    tracing::info!(
        "Mode: {}, on invalid coordinate: {:?}",
        mode_label(&cli.mode),
        runtime.coordinate_policy
    );

    if cli.mode == RunMode::Audit {
        return run_audit(&cli);
    }

    let start = std::time::Instant::now();
    let stats = run_shaping(&cli, &runtime)?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Done! Shaped {} records from {} elements in {:.2}s ({} elements/s)",
        stats.records,
        stats.elements,
        elapsed.as_secs_f64(),
        (stats.elements as f64 / elapsed.as_secs_f64()) as u64
    );
    if stats.skipped > 0 {
        tracing::warn!("Skipped {} elements with invalid coordinates", stats.skipped);
    }

    Ok(())
}
