use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use idgate_core::frame::{self, CameraLens, ColorFormat, Frame, Rotation};
use idgate_pipeline::{ConfigSource, EnvConfigSource, FileConfigSource};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "idgate", about = "idgate face identification diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configuration the pipeline would use right now
    Config {
        /// Read a TOML settings file instead of IDGATE_* environment variables
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Decode a raw frame dump the way the pipeline does and save it as an image
    Decode {
        /// Raw capture buffer
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// gray8, rgb8, yuyv or nv21
        #[arg(long)]
        format: ColorFormat,
        /// Clockwise rotation hint in degrees (0, 90, 180, 270)
        #[arg(long, default_value = "0")]
        rotation: Rotation,
        /// front mirrors the image horizontally
        #[arg(long, default_value = "back")]
        lens: CameraLens,
        /// Output image; format chosen from the extension
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { file } => {
            let config = match &file {
                Some(path) => FileConfigSource::new(path).load(),
                None => EnvConfigSource.load(),
            }
            .context("failed to load configuration")?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Decode {
            input,
            width,
            height,
            format,
            rotation,
            lens,
            output,
        } => {
            let buffer = std::fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            tracing::info!(bytes = buffer.len(), %format, width, height, "decoding frame");

            let raw = Frame::new(buffer, width, height, format).with_rotation(rotation);
            let decoded = frame::decode(&raw, lens).context("frame would be skipped")?;
            decoded
                .save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;

            let (w, h) = decoded.dimensions();
            println!("wrote {w}x{h} image to {}", output.display());
        }
    }

    Ok(())
}
