use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use glacier_seg_rs::{Config, Model, Zone, ZonePipeline};

fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config)?;

    ensure!(
        config.model_path.exists(),
        "Model path does not exist: {}",
        config.model_path.display()
    );
    let zone = Zone::open(&config.zone_dir)
        .with_context(|| format!("Failed to open zone: {}", config.zone_dir.display()))?;

    let model = Model::new(&config.model_path, config.device_id)
        .with_context(|| format!("Failed to load model: {}", config.model_path.display()))?;

    let report = ZonePipeline::new(&model, config.pipeline_options())
        .run(&zone)
        .with_context(|| format!("Zone run failed: {}", config.zone_dir.display()))?;

    for (year, area) in &report.area_by_year {
        println!("{year}: {area:.2} km²");
    }
    for skipped in &report.skipped {
        println!("{}: skipped ({})", skipped.year, skipped.error);
    }
    println!(
        "Done: {} years processed, trend {:.2}%",
        report.area_by_year.len(),
        report.trend
    );

    Ok(())
}

/// `RUST_LOG` wins over `-v` when set.
fn init_tracing(config: &Config) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.log_filter())?,
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}
