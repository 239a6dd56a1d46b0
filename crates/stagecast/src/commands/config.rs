use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let path = Config::path()?;
    let config = Config::load_or_default();
    if path.exists() {
        println!("{} {}", "Config file:".bold(), path.display());
    } else {
        println!(
            "{} {} {}",
            "Config file:".bold(),
            path.display(),
            "(not created yet, showing defaults)".dimmed()
        );
    }
    println!();
    print!("{}", serde_yaml::to_string(&config.effective())?);
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let path = Config::path()?;
    // A broken file must not be silently replaced with defaults.
    let mut config = if path.exists() {
        Config::load_from(&path)?
    } else {
        Config::default()
    };
    config.set(key, value)?;
    config.save_to(&path)?;
    println!("{} {key} = {value}", "Set".green());
    Ok(())
}
