//! CLI command definitions.

use animatic::RenderQuality;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Animatic - render animation scripts in a sandbox with bounded, observable attempts
#[derive(Parser, Debug)]
#[command(name = "animatic")]
#[command(about = "Render animation scripts in a sandbox with bounded, observable attempts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print OpenTelemetry spans to stdout alongside the logs
    #[arg(long, global = true, env = "ANIMATIC_OTEL")]
    pub otel: bool,

    /// Configuration file to use instead of the merged defaults
    #[arg(long, global = true, env = "ANIMATIC_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a script once in a local sandbox
    Render {
        /// Path to the script or diagram snippet
        script: PathBuf,

        /// Quality preset (low, medium, high, production, 4k)
        #[arg(long)]
        quality: Option<RenderQuality>,

        /// Directory for the finished video
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Watermark text
        #[arg(long, conflicts_with = "no_watermark")]
        watermark: Option<String>,

        /// Skip the watermark
        #[arg(long)]
        no_watermark: bool,

        /// Playback speed multiplier
        #[arg(long)]
        speed: Option<f64>,
    },

    /// Print the fingerprint of a script
    Fingerprint {
        /// Path to the script
        file: PathBuf,
    },

    /// Print the merged configuration as TOML
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otel_flag_is_global() {
        let cli = Cli::try_parse_from(["animatic", "config", "--otel"]).unwrap();
        assert!(cli.otel);
        assert!(matches!(cli.command, Commands::Config));

        let cli = Cli::try_parse_from(["animatic", "fingerprint", "scene.py"]).unwrap();
        assert!(!cli.otel);
    }
}
