//! # Memesmith CLI
//!
//! Command-line interface for matching posts to meme templates and
//! rendering captioned memes.
//!
//! ## Usage
//!
//! ```bash
//! # Suggest templates for a post (JSON on stdout)
//! memesmith match "I waited 3 hours for the bus"
//!
//! # ...and write a 300x300 preview per suggestion
//! memesmith match --thumbnails previews/ "I waited 3 hours for the bus"
//!
//! # Render a captioned template
//! memesmith render --template-id 4087833 --top "waiting for the bus" --bottom "3 hours later" --out bus.png
//!
//! # List the catalog
//! memesmith templates
//!
//! # Start the HTTP API
//! memesmith serve --listen 0.0.0.0:8080
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memesmith::{
    MemeError,
    config::Config,
    layout::RenderSettings,
    matching::MatchRequest,
    render::{self, ThumbnailRequest},
    server::{self, AppState},
};

/// Memesmith - match posts to meme templates
#[derive(Parser, Debug)]
#[command(name = "memesmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TrueType font for captions (overrides MEMESMITH_FONT)
    #[arg(long, global = true, value_name = "FILE")]
    font: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Suggest templates and captions for a post
    Match {
        /// The post text
        tweet: String,

        /// Feedback on a previous round of suggestions
        #[arg(long)]
        feedback: Option<String>,

        /// Template id to leave out (repeatable)
        #[arg(long = "exclude", value_name = "ID")]
        exclude: Vec<String>,

        /// Write a thumbnail PNG per candidate into this directory
        #[arg(long, value_name = "DIR")]
        thumbnails: Option<PathBuf>,
    },

    /// Render a captioned template to PNG
    Render {
        #[arg(long)]
        template_id: String,

        #[arg(long, default_value = "")]
        top: String,

        #[arg(long, default_value = "")]
        bottom: String,

        /// Top caption size, percent (50 = default)
        #[arg(long, default_value = "50")]
        top_scale: f32,

        /// Bottom caption size, percent (50 = default)
        #[arg(long, default_value = "50")]
        bottom_scale: f32,

        /// Push the top caption down, 0-50
        #[arg(long, default_value = "0")]
        top_offset: f32,

        /// Push the bottom caption up, 0-50
        #[arg(long, default_value = "0")]
        bottom_offset: f32,

        /// Output PNG path
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// List catalog templates
    Templates,

    /// Start the HTTP API
    Serve {
        /// Address to listen on (overrides MEMESMITH_LISTEN)
        #[arg(long)]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memesmith=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), MemeError> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(font) = cli.font {
        config.font_path = Some(font);
    }

    match cli.command {
        Commands::Match {
            tweet,
            feedback,
            exclude,
            thumbnails,
        } => {
            let state = AppState::from_config(&config)?;
            let mut request = MatchRequest::new(tweet).exclude(exclude);
            request.feedback = feedback;

            let result = state.orchestrator.match_tweet(&request).await?;
            println!("{}", to_json(&result)?);

            if let Some(dir) = thumbnails {
                std::fs::create_dir_all(&dir)?;
                let catalog = state.catalog.get_templates().await?;
                let requests: Vec<ThumbnailRequest> = result
                    .candidates
                    .iter()
                    .filter_map(|c| {
                        Some(ThumbnailRequest {
                            template: catalog.get(&c.template_id)?,
                            top: &c.primary_top_text,
                            bottom: &c.primary_bottom_text,
                        })
                    })
                    .collect();

                let images = state.renderer.thumbnails(&requests).await;
                for (rank, (request, image)) in requests.iter().zip(images).enumerate() {
                    let path = dir.join(format!("{}-{}.png", rank + 1, request.template.id));
                    std::fs::write(&path, render::encode_png(&image)?)?;
                    eprintln!("Wrote {}", path.display());
                }
            }
        }

        Commands::Render {
            template_id,
            top,
            bottom,
            top_scale,
            bottom_scale,
            top_offset,
            bottom_offset,
            out,
        } => {
            let state = AppState::from_config(&config)?;
            let template = state.template(&template_id).await?;
            let settings = RenderSettings {
                top_scale,
                top_offset,
                bottom_scale,
                bottom_offset,
            };

            let image = state.renderer.render(&template, &top, &bottom, settings).await;
            std::fs::write(&out, render::encode_png(&image)?)?;
            eprintln!(
                "Rendered {} ({}x{}) to {}",
                template.name,
                image.width(),
                image.height(),
                out.display()
            );
        }

        Commands::Templates => {
            let state = AppState::from_config(&config)?;
            let catalog = state.catalog.get_templates().await?;
            for template in catalog.templates() {
                println!("{}", memesmith::catalog::describe::describe_template(template));
            }
        }

        Commands::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            let state = Arc::new(AppState::from_config(&config)?);
            server::serve(state, &config.listen_addr).await?;
        }
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, MemeError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| MemeError::MalformedResponse(format!("Failed to serialize output: {}", e)))
}
