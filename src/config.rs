use clap::Parser;
use std::path::PathBuf;

use crate::PipelineOptions;

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Zone directory containing `config.json` and `original/`
    pub zone_dir: PathBuf,

    #[arg(short, long, default_value = "ml/model.onnx")]
    pub model_path: PathBuf,

    /// Images per inference call
    #[arg(short, long, default_value_t = 4, value_parser = check_batch_size)]
    pub batch_size: usize,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(long)]
    pub no_progress: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    pub const fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            batch_size: self.batch_size,
            show_progress: !self.no_progress,
        }
    }

    pub const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn check_batch_size(s: &str) -> Result<usize, String> {
    let size: usize = s
        .parse()
        .map_err(|_| format!("`{s}` is not a valid batch size"))?;
    if size == 0 {
        return Err("batch size must be at least 1".to_string());
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["glacier-seg", "zones/echaurren"]);
        assert_eq!(config.zone_dir, PathBuf::from("zones/echaurren"));
        assert_eq!(config.model_path, PathBuf::from("ml/model.onnx"));
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.device_id, 0);
        assert!(config.pipeline_options().show_progress);
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_flags() {
        let config = Config::parse_from([
            "glacier-seg",
            "zone",
            "-m",
            "model.onnx",
            "-b",
            "2",
            "--no-progress",
            "-vv",
        ]);
        assert_eq!(config.pipeline_options().batch_size, 2);
        assert!(!config.pipeline_options().show_progress);
        assert_eq!(config.log_filter(), "trace");
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(Config::try_parse_from(["glacier-seg", "zone", "-b", "0"]).is_err());
        assert!(check_batch_size("x").is_err());
    }
}
