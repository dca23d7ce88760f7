//! The completion engine: trigger → extract → resolve → suggest →
//! insert.
//!
//! Every collaborator is injected so callers (and tests) can substitute
//! doubles: the permission gate, the suggestion provider, and the
//! presenter all arrive as trait objects; the enabler, injector, and
//! pasteboard are owned here because they hold platform state. All
//! operations are synchronous on the caller's thread -- the underlying
//! accessibility and input-injection primitives are not safe to drive
//! from multiple threads, and every call is bounded in the tens of
//! milliseconds.

use tracing::{debug, info};

use crate::accessibility::{
    extract_text_context, AccessibilityEnabler, ContextSource, ExtractError, TextContext,
};
use crate::app_class::{frontmost_app, AppClass, FrontmostApp};
use crate::clipboard::SystemPasteboard;
use crate::feedback::Presenter;
use crate::geometry::ScreenPoint;
use crate::input::InputInjector;
use crate::insertion::InsertionEngine;
use crate::permissions::PermissionGate;
use crate::position::resolver_for_class;
use crate::settings::AppSettings;
use crate::suggest::CompletionProvider;

/// One capture: everything needed to pop a suggestion list and later
/// insert the chosen completion.
#[derive(Debug)]
pub struct Captured {
    pub context: TextContext,
    pub source: ContextSource,
    /// Screen-space anchor for the suggestion popup.
    pub caret: ScreenPoint,
    pub app: FrontmostApp,
    pub class: AppClass,
}

pub struct CompletionEngine {
    settings: AppSettings,
    permissions: Box<dyn PermissionGate>,
    provider: Box<dyn CompletionProvider>,
    presenter: Box<dyn Presenter>,
    enabler: AccessibilityEnabler,
    input: InputInjector,
    board: SystemPasteboard,
}

impl CompletionEngine {
    pub fn new(
        settings: AppSettings,
        permissions: Box<dyn PermissionGate>,
        provider: Box<dyn CompletionProvider>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        Self {
            settings,
            permissions,
            provider,
            presenter,
            enabler: AccessibilityEnabler::new(),
            input: InputInjector::new(),
            board: SystemPasteboard::new(),
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Capture the word under the cursor of the frontmost app, plus the
    /// on-screen caret position. Signals the user through the presenter
    /// on failure; the caller decides whether to also surface the error.
    pub fn capture(&mut self) -> Result<Captured, ExtractError> {
        let app = frontmost_app().ok_or(ExtractError::NoFocusedElement)?;
        let class = app.class(&self.settings);
        debug!(?class, pid = app.pid, bundle = ?app.bundle_id, "Capturing from frontmost app");

        let extraction = match extract_text_context(
            self.permissions.as_ref(),
            &mut self.enabler,
            &app,
            class,
            &self.input,
            &mut self.board,
        ) {
            Ok(extraction) => extraction,
            Err(err) => {
                match err {
                    ExtractError::PermissionDenied => self.presenter.signal_permission_required(),
                    _ => self.presenter.signal_no_context(),
                }
                return Err(err);
            }
        };

        let caret = resolver_for_class(class, extraction.element.as_ref()).resolve();

        Ok(Captured {
            context: extraction.context,
            source: extraction.source,
            caret,
            app,
            class,
        })
    }

    /// Ranked completions for the captured word, capped by settings.
    pub fn suggestions(&mut self, captured: &Captured) -> Vec<String> {
        if !captured.context.has_word() {
            self.presenter.signal_no_context();
            return Vec::new();
        }
        let mut candidates = self.provider.completions(
            &captured.context.word_at_cursor,
            self.settings.language.as_deref(),
        );
        candidates.truncate(self.settings.max_suggestions);
        info!(
            word = %captured.context.word_at_cursor,
            candidates = candidates.len(),
            "Suggestions ready"
        );
        candidates
    }

    /// Insert the chosen completion back into the host. Silent on
    /// failure by design: no tier partially applies, so the user just
    /// sees no change and can retry.
    pub fn insert(&mut self, captured: &Captured, completion: &str) -> bool {
        if !self.permissions.is_granted() {
            self.presenter.signal_permission_required();
            return false;
        }
        InsertionEngine::new(&self.settings, &self.input, &mut self.board).insert(
            completion,
            &captured.context,
            &captured.app,
            captured.class,
            captured.source,
        )
    }

    /// Drop the per-process accessibility-enabled cache, e.g. when the
    /// user reports a host that stopped answering queries.
    pub fn reset_enabler_cache(&mut self) {
        self.enabler.clear();
    }
}
