use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::deck::{self, Deck, DeckLibrary};
use crate::joke::JokeContent;
use crate::slide::SlideKind;

fn find_deck(name: &str, default_joke_ms: u64) -> Result<Deck> {
    let path = Path::new(name);
    if path.exists() {
        return Ok(deck::load_path(path, default_joke_ms)?);
    }
    DeckLibrary::bundled(default_joke_ms)
        .resolve(name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No deck file or bundled deck named {name}"))
}

pub fn run(name: &str) -> Result<()> {
    let config = Config::load_or_default();
    let deck = find_deck(name, config.default_joke_duration_ms())?;

    println!("{} {}", deck.name.bold(), format!("({})", deck.id).dimmed());
    if let Some(base) = &deck.base_path {
        println!("{} {}", "Base path:".dimmed(), base.display());
    }
    println!();

    let mut errors = 0;
    for (i, slide) in deck.slides.iter().enumerate() {
        let title = slide.title().unwrap_or("");
        let line = format!(
            "{:>3}. {:<16} {:<8} {:<12} {}",
            i + 1,
            slide.id,
            slide.kind.tag(),
            slide.layout.name(),
            title
        );
        match &slide.kind {
            SlideKind::Error { message } => {
                errors += 1;
                println!("{}", line.red());
                println!("     {}", message.red());
            }
            SlideKind::Unknown { .. } => println!("{}", line.yellow()),
            _ => println!("{line}"),
        }
        if !slide.notes.is_empty() {
            println!("     {}", format!("notes: {}", slide.notes).dimmed());
        }
    }

    if let Some(jokes) = deck.jokes.as_ref().filter(|j| !j.is_empty()) {
        println!();
        println!("{}", "Jokes".bold());
        for joke in &jokes.jokes {
            let what = match &joke.content {
                JokeContent::Text { text } => format!("text \"{text}\""),
                JokeContent::Image { src, .. } => format!("image {src}"),
                JokeContent::Gif { src, .. } => format!("gif {src}"),
                JokeContent::Video { src, .. } => format!("video {src}"),
            };
            println!(
                "  [{}] {:<14} {} {}",
                joke.hotkey.green(),
                joke.id,
                what,
                format!("{}ms, {}", joke.display_duration_ms, joke.animation.entry).dimmed()
            );
        }
    }

    if errors > 0 {
        println!();
        println!("{}", format!("{errors} slide(s) failed to load.").red());
    }
    Ok(())
}
