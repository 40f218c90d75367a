//! Animatic CLI binary.
//!
//! This binary provides command-line access to animatic's functionality:
//! - Render a script once in a local sandbox
//! - Print the whitespace-insensitive fingerprint of a script
//! - Show the merged configuration

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, RenderArgs, fingerprint_file, render_script, show_config};

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let _telemetry = animatic::init_telemetry(animatic::TelemetryOptions {
        verbose: cli.verbose,
        export_spans: cli.otel,
    })?;

    match cli.command {
        Commands::Render {
            script,
            quality,
            output_dir,
            watermark,
            no_watermark,
            speed,
        } => {
            let args = RenderArgs {
                script,
                quality,
                output_dir,
                watermark,
                no_watermark,
                speed,
            };
            render_script(&args, cli.config.as_deref()).await?;
        }

        Commands::Fingerprint { file } => {
            fingerprint_file(&file).await?;
        }

        Commands::Config => {
            show_config(cli.config.as_deref())?;
        }
    }

    Ok(())
}
