//! Text insertion: write the chosen completion back into the host.
//!
//! Tier selection is driven by application class. Terminal-class hosts
//! and a configured set of IDE/editor hosts get the clipboard-paste
//! procedure exclusively; everything else walks direct AX rewrite, then
//! synthetic keystrokes, then (only when no element was ever located)
//! the clipboard procedure as a last resort. Tier failures are absorbed
//! and trigger the next tier; the overall result is a bool and never an
//! error. Failed tiers are designed not to partially apply.

use crate::accessibility::ContextSource;
use crate::app_class::AppClass;
use crate::settings::AppSettings;

/// The three insertion mechanisms, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionTier {
    /// Rewrite the element's value attribute and re-place the caret.
    DirectRewrite,
    /// Backspace out the partial word, then type the completion.
    Keystrokes,
    /// Stage the completion on the clipboard and paste it.
    ClipboardPaste,
}

/// Which tiers apply for a host, in the order they should be tried.
pub fn tier_plan(
    class: AppClass,
    bundle_id: Option<&str>,
    settings: &AppSettings,
    source: ContextSource,
) -> Vec<InsertionTier> {
    let paste_only = class == AppClass::Terminal
        || bundle_id.map(|id| settings.is_paste_only(id)).unwrap_or(false);
    if paste_only {
        return vec![InsertionTier::ClipboardPaste];
    }

    let mut plan = vec![InsertionTier::DirectRewrite, InsertionTier::Keystrokes];
    if source == ContextSource::Unlocated {
        plan.push(InsertionTier::ClipboardPaste);
    }
    plan
}

/// Replace the word span with the completion in the host's current
/// text. Span indices are clamped to the current length: extraction and
/// insertion are not atomic, and the host's text may have changed in
/// between. Returns the new text and the character offset immediately
/// after the inserted completion.
pub fn rewrite_text(
    current_text: &str,
    word_span: (usize, usize),
    completion: &str,
) -> (String, usize) {
    let chars: Vec<char> = current_text.chars().collect();
    let len = chars.len();
    let start = word_span.0.min(len);
    let end = word_span.1.clamp(start, len);

    let mut rewritten: String = chars[..start].iter().collect();
    rewritten.push_str(completion);
    rewritten.extend(chars[end..].iter().copied());

    (rewritten, start + completion.chars().count())
}

#[cfg(target_os = "macos")]
pub use macos::InsertionEngine;

#[cfg(target_os = "macos")]
mod macos {
    use std::thread;
    use std::time::Duration;

    use tracing::{debug, info, warn};

    use super::{rewrite_text, tier_plan, InsertionTier};
    use crate::accessibility::{macos as ax, utf16_offset_of_char, ContextSource, TextContext};
    use crate::app_class::{AppClass, FrontmostApp};
    use crate::clipboard::{ClipboardTransaction, Pasteboard};
    use crate::input::InputInjector;
    use crate::settings::AppSettings;

    /// Runs the tier chain against the live host. Holds borrowed
    /// collaborators so the engine composes with whatever the caller
    /// injected.
    pub struct InsertionEngine<'a> {
        settings: &'a AppSettings,
        input: &'a InputInjector,
        board: &'a mut dyn Pasteboard,
    }

    impl<'a> InsertionEngine<'a> {
        pub fn new(
            settings: &'a AppSettings,
            input: &'a InputInjector,
            board: &'a mut dyn Pasteboard,
        ) -> Self {
            Self {
                settings,
                input,
                board,
            }
        }

        /// Insert `completion` in place of the context's word at cursor.
        /// True iff some tier succeeded.
        pub fn insert(
            &mut self,
            completion: &str,
            context: &TextContext,
            app: &FrontmostApp,
            class: AppClass,
            source: ContextSource,
        ) -> bool {
            let plan = tier_plan(class, app.bundle_id.as_deref(), self.settings, source);
            info!(?plan, ?class, completion_chars = completion.chars().count(), "Starting insertion");

            for tier in plan {
                let ok = match tier {
                    InsertionTier::DirectRewrite => self.insert_via_rewrite(completion, context),
                    InsertionTier::Keystrokes => self.insert_via_keystrokes(completion, context, app),
                    InsertionTier::ClipboardPaste => self.insert_via_clipboard(completion, context),
                };
                if ok {
                    info!(?tier, "Insertion succeeded");
                    return true;
                }
                debug!(?tier, "Insertion tier failed, trying next");
            }

            warn!("Every applicable insertion tier failed");
            false
        }

        /// Tier 1: rewrite the element's value and re-place the caret.
        /// Read-only elements reject the write and the chain continues.
        fn insert_via_rewrite(&mut self, completion: &str, context: &TextContext) -> bool {
            let Some(element) = ax::refetch_focused_element() else {
                debug!("Direct rewrite: no focused element to write to");
                return false;
            };

            // Rewrite against what the host holds now, not the snapshot;
            // the span clamp covers text that shrank since extraction.
            let current = ax::current_value(&element)
                .unwrap_or_else(|| context.full_text.clone());
            let (rewritten, caret_chars) =
                rewrite_text(&current, context.word_span, completion);

            if let Err(e) = ax::set_value_text(&element, &rewritten) {
                debug!("Direct rewrite rejected: {}", e);
                return false;
            }

            // Caret placement is best-effort; the write itself already
            // succeeded.
            let caret_utf16 = utf16_offset_of_char(&rewritten, caret_chars);
            if let Err(e) = ax::set_caret_utf16(&element, caret_utf16) {
                warn!("Could not re-place caret after rewrite: {}", e);
            }
            true
        }

        /// Tier 2: erase the partial word with backspaces and type the
        /// completion. Focus-sensitive: the host is re-activated
        /// immediately before any key lands.
        fn insert_via_keystrokes(
            &mut self,
            completion: &str,
            context: &TextContext,
            app: &FrontmostApp,
        ) -> bool {
            if !self.input.try_init() {
                return false;
            }
            if !app.activate() {
                warn!(pid = app.pid, "Could not re-activate host, refusing to type blind");
                return false;
            }
            thread::sleep(Duration::from_millis(self.settings.paste_settle_ms));

            let delay = Duration::from_millis(self.settings.keystroke_delay_ms.max(1));
            let erase = context.word_at_cursor.chars().count();
            if let Err(e) = self.input.send_backspaces(erase, delay) {
                warn!("Backspace run failed: {}", e);
                return false;
            }
            if let Err(e) = self.input.type_ascii(completion, delay) {
                warn!("Typing completion failed: {}", e);
                return false;
            }
            true
        }

        /// Tier 3 / terminal procedure: snapshot the clipboard, delete
        /// the partial word with the shell's backward-word-delete
        /// control sequence, paste the completion, restore the
        /// clipboard. Settling sleeps separate every step because the
        /// host consumes these as asynchronous input events.
        fn insert_via_clipboard(&mut self, completion: &str, context: &TextContext) -> bool {
            if !self.input.try_init() {
                return false;
            }

            let settle = Duration::from_millis(self.settings.clipboard_settle_ms);
            let mut txn = ClipboardTransaction::begin(&mut *self.board);

            if context.has_word() {
                if let Err(e) = self.input.send_backward_word_delete() {
                    warn!("Backward-word-delete failed: {}", e);
                    return false; // txn drop restores the clipboard
                }
                thread::sleep(settle);
            }

            if !txn.board().set_text(completion) {
                warn!("Could not stage completion on the clipboard");
                return false;
            }
            thread::sleep(settle);

            if let Err(e) = self.input.send_paste_chord() {
                warn!("Paste chord failed: {}", e);
                return false;
            }

            // Let the host consume the paste before yanking the
            // clipboard back from under it.
            thread::sleep(Duration::from_millis(self.settings.clipboard_restore_delay_ms));
            txn.restore_now();
            true
        }
    }
}
