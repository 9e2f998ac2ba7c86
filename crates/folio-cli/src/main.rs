//! Folio CLI - Headless Viewer Driver
//!
//! Features:
//! - Renderer resolution for a manifest canvas
//! - Full pipeline activation with headless renderers
//! - Content-type binding inspection

use clap::{Parser, Subcommand};

mod commands;
mod output;

/// Folio CLI - IIIF viewer pipeline toolkit
#[derive(Parser)]
#[command(name = "folio")]
#[command(author = "Folio Contributors")]
#[command(version)]
#[command(about = "Resolve, activate and inspect IIIF resources headlessly", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

/// Viewer state options shared by the pipeline commands
#[derive(clap::Args)]
struct StateArgs {
    /// Manifest or collection URI (http(s), file:// or a local path)
    uri: String,

    /// Canvas to display
    #[arg(short, long, default_value = "0")]
    canvas_index: usize,

    /// Sequence to display
    #[arg(short, long, default_value = "0")]
    sequence_index: usize,

    /// Manifest index inside a collection
    #[arg(long)]
    collection_index: Option<usize>,

    /// Primary locale
    #[arg(short, long, default_value = "en-GB")]
    locale: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which renderer a canvas resolves to
    Resolve {
        #[command(flatten)]
        state: StateArgs,
    },

    /// Run the full reload pipeline with headless renderers
    Activate {
        #[command(flatten)]
        state: StateArgs,

        /// Asset root holding lib/ configuration and themes/
        #[arg(short, long, default_value = "./folio")]
        root: String,

        /// Remote configuration override
        #[arg(long)]
        config_uri: Option<String>,

        /// Fetch the override through the script-injection transport
        #[arg(long)]
        no_cors: bool,
    },

    /// List content-type bindings
    Keys,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    folio_core::init();

    match cli.command {
        Commands::Resolve { state } => {
            commands::resolve(&state.into_request(), &cli.format).await?;
        }
        Commands::Activate { state, root, config_uri, no_cors } => {
            let mut viewer_state = state.into_viewer_state();
            viewer_state.root = root;
            viewer_state.config_uri = config_uri;
            commands::activate(viewer_state, !no_cors, &cli.format).await?;
        }
        Commands::Keys => {
            commands::keys(&cli.format)?;
        }
    }

    Ok(())
}

impl StateArgs {
    fn into_viewer_state(self) -> folio_core::ViewerState {
        folio_core::ViewerState {
            collection_index: self.collection_index,
            sequence_index: Some(self.sequence_index),
            canvas_index: self.canvas_index,
            locales: vec![folio_core::Locale::new(self.locale)],
            ..folio_core::ViewerState::for_resource(self.uri)
        }
    }

    fn into_request(self) -> folio_core::LoadRequest {
        folio_core::LoadRequest::from_state(&self.into_viewer_state())
    }
}
