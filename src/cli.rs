//! Command-line interface: one-shot commands for driving the engine
//! without the suggestion popup.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "quickspell",
    about = "Inline spelling completions for whatever app has the keyboard",
    version
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Capture and print the text context under the cursor of the
    /// frontmost app.
    Context {
        /// Seconds to wait before capturing, so another app can be
        /// focused first.
        #[arg(long, default_value_t = 3)]
        delay_secs: u64,
    },
    /// Print spelling completions for a word without touching any app.
    Suggest {
        word: String,
        /// Spell-check language tag (e.g. en_US); defaults to the
        /// configured or system language.
        #[arg(long)]
        language: Option<String>,
    },
    /// Run the full flow: capture the word under the cursor, list
    /// completions, insert one back into the app.
    Complete {
        /// Index of the completion to insert (1-based). Without it the
        /// top candidate is used.
        #[arg(long)]
        pick: Option<usize>,
        /// Seconds to wait before capturing, so another app can be
        /// focused first.
        #[arg(long, default_value_t = 3)]
        delay_secs: u64,
        /// List candidates and exit without inserting.
        #[arg(long)]
        dry_run: bool,
    },
    /// Check (and optionally prompt for) accessibility permission.
    Permissions {
        /// Ask macOS to show the grant prompt when not yet trusted.
        #[arg(long)]
        prompt: bool,
    },
    /// Print the frontmost application's identity and behavior class.
    Frontmost,
}
