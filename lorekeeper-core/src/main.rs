use clap::Parser;
use lorekeeper_core::config::CoreConfig;
use lorekeeper_core::{init_tracing, Core};
use tracing::info;

/// Demo binary: wires one `Core` from CLI/env config and runs a single
/// `FetchMetadata` call for a named artist, printing the merged result.
/// Everything else (HTTP surface, scanning, scheduling) is an external
/// collaborator's job per §1 — this binary exists so the library is
/// runnable, not as a server.
#[derive(Parser)]
#[command(name = "lorekeeperd", version)]
struct Cli {
    #[command(flatten)]
    config: CoreConfig,

    /// Artist name to fetch metadata for.
    #[arg(long)]
    artist: String,

    /// Known MusicBrainz id for the artist, if any.
    #[arg(long)]
    mbid: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    info!(artist = %cli.artist, "starting curation run");

    let core = Core::new(&cli.config);
    let result = core.orchestrator.fetch_metadata(cli.mbid.as_deref(), Some(&cli.artist)).await;

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "failed to render fetch result"),
    }

    for error in &result.errors {
        tracing::warn!(error, "provider error during fetch");
    }
}
