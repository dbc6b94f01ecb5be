pub mod types;
pub mod config;
pub mod data;
pub mod grouping;
pub mod filter;
pub mod icon;
pub mod render;
pub mod export;
pub mod debounce;
pub mod atlas;
pub mod html;
pub mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::atlas::Atlas;
use crate::filter::apply_filter;
use crate::types::{FilterState, TypeBucket};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the location groups, table and categories as static files
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "atlas.toml")]
        config: PathBuf,
        /// Overrides `output.dir` from the config
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
    /// Serve the interactive map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "atlas.toml")]
        config: PathBuf,
    },
    /// Export a filtered set of organizations as CSV
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "atlas.toml")]
        config: PathBuf,
        /// Type bucket: startup or other
        #[arg(long = "type", value_name = "BUCKET")]
        type_bucket: Option<TypeBucket>,
        /// Category to keep (repeatable, startup bucket only)
        #[arg(long = "category", value_name = "NAME")]
        categories: Vec<String>,
        /// Output file; stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { config, out } => {
            info!("Generating atlas with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;
            let out_dir = out.unwrap_or_else(|| app_config.output.dir.clone());

            let atlas = Atlas::load(app_config)?;
            atlas.write_artifacts(&out_dir)?;

            info!("Generation complete!");
        }
        Commands::Serve { config } => {
            info!("Serving atlas with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            // A failed load still starts the server so the page can report it.
            let loaded = Atlas::load(app_config.clone());
            server::start_server(app_config, loaded).await?;
        }
        Commands::Export { config, type_bucket, categories, out } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let atlas = Atlas::load(app_config)?;
            let filter = FilterState::new(type_bucket, categories);

            let indices = apply_filter(atlas.records(), &filter);
            let writer: Box<dyn Write> = match &out {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
                )),
                None => Box::new(io::stdout().lock()),
            };
            export::write_organizations(writer, atlas.records(), &indices, b',')?;
            info!("Exported {} of {} organizations", indices.len(), atlas.records().len());
        }
    }

    Ok(())
}
