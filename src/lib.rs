//! Quickspell: inline spelling completions for whatever application has
//! the keyboard.
//!
//! The core engine reads the word under the text cursor of the frontmost
//! app through the macOS Accessibility API, resolves where that cursor is
//! on screen, asks the system spell checker for completions, and writes
//! the chosen completion back using whichever insertion mechanism the
//! host application actually supports.

pub mod accessibility;
pub mod app_class;
pub mod cli;
pub mod clipboard;
#[cfg(target_os = "macos")]
pub mod engine;
pub mod feedback;
pub mod geometry;
pub mod input;
pub mod insertion;
pub mod keymap;
pub mod permissions;
pub mod position;
pub mod settings;
pub mod suggest;
pub mod tracing_config;

pub use cli::CliArgs;
