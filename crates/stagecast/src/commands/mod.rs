pub mod completion;
pub mod config;
pub mod decks;
pub mod inspect;
pub mod present;
pub mod version;
