//! Stagecast: a slideshow presenter that keeps a second audience window in
//! lockstep with the presenter's window.

pub mod app;
pub mod audience;
pub mod cli;
pub mod commands;
pub mod config;
pub mod deck;
pub mod error;
pub mod joke;
pub mod keyboard;
pub mod markup;
pub mod navigation;
pub mod session;
pub mod slide;
pub mod surface;
pub mod sync;
pub mod theme;
pub mod web;
