use anyhow::Result;
use clap::Parser;

use quickspell::cli::{CliArgs, Command};

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("quickspell")
        .join("logs");
    std::fs::create_dir_all(&log_dir)?;
    quickspell::tracing_config::init_tracing(&log_dir)?;

    run(args)
}

#[cfg(target_os = "macos")]
fn run(args: CliArgs) -> Result<()> {
    use quickspell::engine::CompletionEngine;
    use quickspell::feedback::SystemPresenter;
    use quickspell::permissions::{PermissionGate, SystemPermissions};
    use quickspell::settings::get_settings;
    use quickspell::suggest::{CachedCompletions, SystemSpellChecker};

    let settings = get_settings();

    let build_engine = |settings: quickspell::settings::AppSettings| {
        let cache_capacity = settings.suggestion_cache_capacity;
        CompletionEngine::new(
            settings,
            Box::new(SystemPermissions),
            Box::new(CachedCompletions::new(
                SystemSpellChecker::new(),
                cache_capacity,
            )),
            Box::new(SystemPresenter),
        )
    };

    match args.command {
        Command::Context { delay_secs } => {
            countdown(delay_secs);
            let mut engine = build_engine(settings);
            let captured = engine.capture()?;
            println!("app:      {:?} ({:?})", captured.app.bundle_id, captured.class);
            println!("source:   {:?}", captured.source);
            println!("caret:    ({:.1}, {:.1})", captured.caret.x, captured.caret.y);
            println!("cursor:   {}", captured.context.cursor_position);
            println!("word:     {:?}", captured.context.word_at_cursor);
            println!("selected: {:?}", captured.context.selected_text);
            println!("before:   {:?}", tail(&captured.context.text_before_cursor, 40));
            println!("after:    {:?}", head(&captured.context.text_after_cursor, 40));
        }
        Command::Suggest { word, language } => {
            use quickspell::suggest::CompletionProvider;
            let mut provider =
                CachedCompletions::new(SystemSpellChecker::new(), settings.suggestion_cache_capacity);
            let language = language.or_else(|| settings.language.clone());
            for (index, candidate) in provider
                .completions(&word, language.as_deref())
                .iter()
                .take(settings.max_suggestions)
                .enumerate()
            {
                println!("{:2}. {}", index + 1, candidate);
            }
        }
        Command::Complete {
            pick,
            delay_secs,
            dry_run,
        } => {
            countdown(delay_secs);
            let mut engine = build_engine(settings);
            let captured = engine.capture()?;
            let candidates = engine.suggestions(&captured);
            if candidates.is_empty() {
                println!("No completions for {:?}", captured.context.word_at_cursor);
                return Ok(());
            }
            for (index, candidate) in candidates.iter().enumerate() {
                println!("{:2}. {}", index + 1, candidate);
            }
            if dry_run {
                return Ok(());
            }
            let choice = pick
                .unwrap_or(1)
                .saturating_sub(1)
                .min(candidates.len() - 1);
            let completion = &candidates[choice];
            if engine.insert(&captured, completion) {
                println!("Inserted {:?}", completion);
            } else {
                println!("Insertion failed; the host text is unchanged");
            }
        }
        Command::Permissions { prompt } => {
            let gate = SystemPermissions;
            let granted = if prompt {
                gate.request_if_needed()
            } else {
                gate.is_granted()
            };
            println!(
                "accessibility permission: {}",
                if granted { "granted" } else { "not granted" }
            );
            if !granted {
                quickspell::permissions::open_accessibility_settings()
                    .map_err(anyhow::Error::msg)?;
            }
        }
        Command::Frontmost => {
            countdown(2);
            match quickspell::app_class::frontmost_app() {
                Some(app) => {
                    println!("pid:    {}", app.pid);
                    println!("bundle: {:?}", app.bundle_id);
                    println!("name:   {:?}", app.name);
                    println!("class:  {:?}", app.class(&quickspell::settings::get_settings()));
                }
                None => println!("No frontmost application reported"),
            }
        }
    }
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run(_args: CliArgs) -> Result<()> {
    anyhow::bail!("quickspell drives the macOS accessibility APIs and only runs on macOS")
}

#[cfg(target_os = "macos")]
fn countdown(secs: u64) {
    if secs == 0 {
        return;
    }
    eprintln!("Focus the target app; capturing in {}s...", secs);
    std::thread::sleep(std::time::Duration::from_secs(secs));
}

#[cfg(target_os = "macos")]
fn tail(text: &str, chars: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(chars)).collect()
}

#[cfg(target_os = "macos")]
fn head(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}
