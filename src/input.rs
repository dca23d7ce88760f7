//! Synthetic keyboard input via enigo.
//!
//! All chords use raw virtual keycodes (`Key::Other`) rather than
//! `Key::Unicode`: unicode keys trigger layout-dependent keycode lookup
//! through the text services manager, which requires the main dispatch
//! queue on macOS and crashes off it. The injector is initialized lazily
//! because creating an Enigo instance triggers the accessibility
//! permission dialog, which should never happen on a fresh launch before
//! the user has opted in.

#[cfg(target_os = "macos")]
mod macos {
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    use enigo::{Direction, Enigo, Key, Keyboard, Settings};
    use tracing::{debug, warn};

    use crate::keymap::{self, KeyStroke};

    /// Owns the lazily-initialized Enigo instance. Enigo needs mutable
    /// access, hence the Mutex; the inner Option defers construction
    /// until accessibility permission is granted.
    pub struct InputInjector(Mutex<Option<Enigo>>);

    impl InputInjector {
        /// Initialize eagerly only when permission is already granted,
        /// so a fresh launch never triggers the system dialog.
        pub fn new() -> Self {
            if crate::permissions::check_accessibility_permission() {
                match Enigo::new(&Settings::default()) {
                    Ok(enigo) => {
                        debug!("Enigo initialized at startup (permissions already granted)");
                        return Self(Mutex::new(Some(enigo)));
                    }
                    Err(e) => {
                        warn!("Failed to initialize Enigo despite permissions: {}", e);
                    }
                }
            }
            Self(Mutex::new(None))
        }

        /// Try to initialize Enigo if it hasn't been initialized yet.
        /// Returns true if the injector is now usable.
        pub fn try_init(&self) -> bool {
            let mut guard = self.0.lock().unwrap();
            if guard.is_some() {
                return true;
            }
            match Enigo::new(&Settings::default()) {
                Ok(enigo) => {
                    *guard = Some(enigo);
                    true
                }
                Err(e) => {
                    warn!("Failed to initialize Enigo: {}", e);
                    false
                }
            }
        }

        pub fn is_available(&self) -> bool {
            self.0.lock().map(|guard| guard.is_some()).unwrap_or(false)
        }

        fn with_enigo<R>(
            &self,
            f: impl FnOnce(&mut Enigo) -> Result<R, String>,
        ) -> Result<R, String> {
            let mut guard = self
                .0
                .lock()
                .map_err(|_| "input injector lock poisoned".to_string())?;
            match guard.as_mut() {
                Some(enigo) => f(enigo),
                None => Err("input injector not initialized".to_string()),
            }
        }

        /// Cmd+V using the raw 'V' keycode so the chord works regardless
        /// of keyboard layout.
        pub fn send_paste_chord(&self) -> Result<(), String> {
            self.with_enigo(|enigo| chord(enigo, Key::Meta, keymap::KEY_V))
        }

        /// Cmd+C, used by the clipboard-mediated selection capture.
        pub fn send_copy_chord(&self) -> Result<(), String> {
            self.with_enigo(|enigo| chord(enigo, Key::Meta, keymap::KEY_C))
        }

        /// Ctrl+W: the shell's backward-word-delete control sequence.
        /// A single control keystroke, deliberately not arrow keys --
        /// terminals translate arrows into escape sequences that would
        /// land in the scrollback as garbage.
        pub fn send_backward_word_delete(&self) -> Result<(), String> {
            self.with_enigo(|enigo| chord(enigo, Key::Control, keymap::KEY_W))
        }

        /// One backspace per character, each separated by a settling
        /// delay since the host consumes key events asynchronously.
        pub fn send_backspaces(&self, count: usize, delay: Duration) -> Result<(), String> {
            self.with_enigo(|enigo| {
                for _ in 0..count {
                    enigo
                        .key(Key::Other(keymap::KEY_DELETE), Direction::Click)
                        .map_err(|e| format!("Failed to send backspace: {}", e))?;
                    thread::sleep(delay);
                }
                Ok(())
            })
        }

        /// Type text as key-down/key-up pairs through the ASCII keycode
        /// map. Characters without a mapping are skipped; callers accept
        /// that as a documented limitation of this tier.
        pub fn type_ascii(&self, text: &str, delay: Duration) -> Result<(), String> {
            self.with_enigo(|enigo| {
                let mut skipped = 0usize;
                for c in text.chars() {
                    match keymap::ascii_keystroke(c) {
                        Some(stroke) => press(enigo, stroke)?,
                        None => {
                            skipped += 1;
                            continue;
                        }
                    }
                    thread::sleep(delay);
                }
                if skipped > 0 {
                    warn!(skipped, "Skipped characters outside the ASCII keycode map");
                }
                Ok(())
            })
        }
    }

    impl Default for InputInjector {
        fn default() -> Self {
            Self::new()
        }
    }

    fn press(enigo: &mut Enigo, stroke: KeyStroke) -> Result<(), String> {
        if stroke.shifted {
            enigo
                .key(Key::Shift, Direction::Press)
                .map_err(|e| format!("Failed to press Shift: {}", e))?;
        }
        let result = enigo
            .key(Key::Other(stroke.code), Direction::Click)
            .map_err(|e| format!("Failed to click key {:#x}: {}", stroke.code, e));
        if stroke.shifted {
            enigo
                .key(Key::Shift, Direction::Release)
                .map_err(|e| format!("Failed to release Shift: {}", e))?;
        }
        result
    }

    fn chord(enigo: &mut Enigo, modifier: Key, code: u32) -> Result<(), String> {
        enigo
            .key(modifier, Direction::Press)
            .map_err(|e| format!("Failed to press modifier key: {}", e))?;
        enigo
            .key(Key::Other(code), Direction::Click)
            .map_err(|e| format!("Failed to click key {:#x}: {}", code, e))?;

        thread::sleep(Duration::from_millis(50));

        enigo
            .key(modifier, Direction::Release)
            .map_err(|e| format!("Failed to release modifier key: {}", e))?;
        Ok(())
    }
}

#[cfg(target_os = "macos")]
pub use macos::InputInjector;

/// Stub injector for non-macOS platforms; every operation reports
/// failure.
#[cfg(not(target_os = "macos"))]
pub struct InputInjector;

#[cfg(not(target_os = "macos"))]
impl InputInjector {
    pub fn new() -> Self {
        Self
    }

    pub fn try_init(&self) -> bool {
        false
    }

    pub fn is_available(&self) -> bool {
        false
    }

    pub fn send_paste_chord(&self) -> Result<(), String> {
        Err("input injection is only supported on macOS".to_string())
    }

    pub fn send_copy_chord(&self) -> Result<(), String> {
        Err("input injection is only supported on macOS".to_string())
    }

    pub fn send_backward_word_delete(&self) -> Result<(), String> {
        Err("input injection is only supported on macOS".to_string())
    }

    pub fn send_backspaces(&self, _count: usize, _delay: std::time::Duration) -> Result<(), String> {
        Err("input injection is only supported on macOS".to_string())
    }

    pub fn type_ascii(&self, _text: &str, _delay: std::time::Duration) -> Result<(), String> {
        Err("input injection is only supported on macOS".to_string())
    }
}

#[cfg(not(target_os = "macos"))]
impl Default for InputInjector {
    fn default() -> Self {
        Self::new()
    }
}
