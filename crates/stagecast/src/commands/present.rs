use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::app::{self, LaunchOptions};
use crate::config::{AudienceHost, Config};
use crate::deck::{self, DeckId, DeckLibrary};
use crate::session::{SessionOptions, Transition};

pub struct PresentArgs {
    pub decks: Vec<PathBuf>,
    pub windowed: bool,
    pub slide: Option<usize>,
    pub deck: Option<String>,
    pub audience: Option<AudienceHost>,
    pub port: Option<u16>,
    pub open_audience: bool,
}

/// Bundled decks followed by every deck loaded from `paths`.
///
/// Returns the library and the id of the first loaded external deck.
pub fn build_library(paths: &[PathBuf], default_joke_ms: u64) -> Result<(DeckLibrary, Option<DeckId>)> {
    let mut library = DeckLibrary::bundled(default_joke_ms);
    let mut first_external = None;
    for path in paths {
        let deck = deck::load_path(path, default_joke_ms)
            .with_context(|| format!("Failed to load deck from {}", path.display()))?;
        tracing::info!("loaded deck {} ({} slides) from {}", deck.name, deck.len(), path.display());
        first_external.get_or_insert_with(|| deck.id.clone());
        library.insert(deck);
    }
    Ok((library, first_external))
}

pub fn run(args: PresentArgs) -> Result<()> {
    let config = Config::load_or_default();
    let (library, first_external) = build_library(&args.decks, config.default_joke_duration_ms())?;

    let start_deck = match &args.deck {
        Some(name) => Some(
            library
                .resolve(name)
                .map(|d| d.id.clone())
                .ok_or_else(|| anyhow::anyhow!("Unknown deck: {name}. Run `stagecast decks` to list them."))?,
        ),
        None => first_external,
    };

    let options = SessionOptions {
        theme: config.theme().to_string(),
        transition: Transition::from_name(config.transition()),
        remote_navigation: config.remote_navigation(),
        start_deck,
        start_slide: args.slide.map(|s| s.saturating_sub(1)).unwrap_or(0),
        fullscreen: !args.windowed,
    };
    let launch = LaunchOptions {
        windowed: args.windowed,
        open_audience: args.open_audience,
        host: args.audience.unwrap_or(config.audience_host()),
        port: args.port.unwrap_or(config.port()),
        sources: args.decks,
    };
    app::run(library, options, launch, &config)
}
