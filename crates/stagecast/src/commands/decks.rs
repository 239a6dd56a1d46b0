use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;

pub fn run(paths: &[PathBuf]) -> Result<()> {
    let config = Config::load_or_default();
    let (library, _) = super::present::build_library(paths, config.default_joke_duration_ms())?;

    for deck in library.iter() {
        let jokes = deck.jokes.as_ref().map_or(0, |j| j.len());
        let origin = if deck.is_external() {
            deck.base_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        } else {
            "bundled".to_string()
        };
        println!(
            "{}  {}  {}",
            deck.id.as_str().bold(),
            deck.name,
            format!("{} slide(s), {jokes} joke(s), {origin}", deck.len()).dimmed()
        );
    }
    Ok(())
}
