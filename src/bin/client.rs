use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use image_converter::client::{ConverterClient, ConverterUi};
use image_converter::domain::conversion::TargetFormat;

#[derive(Parser)]
#[command(name = "image-converter-client", about = "Convert images and manage conversion history")]
struct Cli {
    /// Base URL of the converter server.
    #[arg(long, env = "IMAGE_CONVERTER_URL", default_value = "http://localhost:5000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload an image and convert it.
    Convert {
        file: PathBuf,
        #[arg(short, long, default_value = "jpeg", value_parser = parse_format)]
        format: TargetFormat,
        /// Also download the converted image to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the most recent conversions.
    History,
    /// Delete a conversion and its converted file.
    Delete { id: Uuid },
}

fn parse_format(value: &str) -> Result<TargetFormat, String> {
    TargetFormat::parse(value).ok_or_else(|| format!("expected one of jpeg, png, webp; got {}", value))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let api = ConverterClient::new(&cli.server)?;
    let mut ui = ConverterUi::new(api);

    match cli.command {
        Command::Convert {
            file,
            format,
            output,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let name = file
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("invalid file name: {}", file.display()))?
                .to_string();

            ui.select_file(&name, data)?;
            ui.set_target_format(format);
            let url = ui
                .convert()
                .await
                .map_err(|_| anyhow!("Failed to convert image. Please try again."))?;
            println!("Converted image: {}", url);

            if let Some(output) = output {
                let bytes = ui.api().fetch_asset(&url).await?;
                tokio::fs::write(&output, bytes)
                    .await
                    .with_context(|| format!("failed to write {}", output.display()))?;
                println!("Saved to {}", output.display());
            }

            print_history(&ui);
        }
        Command::History => {
            ui.fetch_history()
                .await
                .map_err(|_| anyhow!("Failed to fetch history"))?;
            print_history(&ui);
        }
        Command::Delete { id } => {
            ui.delete(id)
                .await
                .map_err(|_| anyhow!("Failed to delete image"))?;
            println!("Image deleted successfully");
            print_history(&ui);
        }
    }

    Ok(())
}

fn print_history(ui: &ConverterUi) {
    println!("Conversion History");
    for line in ui.history().render() {
        println!("  {}", line);
    }
}
