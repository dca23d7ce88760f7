//! Frontmost-application identity and behavior classification.
//!
//! The four classes drive which extraction and insertion fallbacks apply.
//! Classification is a pure lookup over static bundle-identifier sets and
//! is recomputed on every operation; nothing here is cached across app
//! switches.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::settings::AppSettings;

/// Behavior class of a host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppClass {
    Native,
    Browser,
    Electron,
    Terminal,
}

static BROWSER_BUNDLES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "com.apple.Safari",
        "com.apple.SafariTechnologyPreview",
        "com.google.Chrome",
        "com.google.Chrome.canary",
        "org.chromium.Chromium",
        "org.mozilla.firefox",
        "org.mozilla.firefoxdeveloperedition",
        "com.microsoft.edgemac",
        "com.brave.Browser",
        "com.operasoftware.Opera",
        "com.vivaldi.Vivaldi",
        "company.thebrowser.Browser",
    ])
});

static ELECTRON_BUNDLES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "com.microsoft.VSCode",
        "com.microsoft.VSCodeInsiders",
        "com.visualstudio.code.oss",
        "com.tinyspeck.slackmacgap",
        "com.hnc.Discord",
        "notion.id",
        "com.figma.Desktop",
        "com.spotify.client",
        "md.obsidian",
        "com.github.GitHubClient",
        "com.postmanlabs.mac",
        "org.whispersystems.signal-desktop",
    ])
});

static TERMINAL_BUNDLES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "com.apple.Terminal",
        "com.googlecode.iterm2",
        "dev.warp.Warp-Stable",
        "net.kovidgoyal.kitty",
        "io.alacritty",
        "org.alacritty",
        "com.github.wez.wezterm",
        "co.zeit.hyper",
        "com.mitchellh.ghostty",
    ])
});

impl AppClass {
    /// Classify a bundle identifier against the static sets. Terminal
    /// wins over the other sets; anything unmatched is Native.
    pub fn of(bundle_id: &str) -> AppClass {
        if TERMINAL_BUNDLES.contains(bundle_id) {
            AppClass::Terminal
        } else if BROWSER_BUNDLES.contains(bundle_id) {
            AppClass::Browser
        } else if ELECTRON_BUNDLES.contains(bundle_id) {
            AppClass::Electron
        } else {
            AppClass::Native
        }
    }

    /// Classification with the user's settings overlays applied on top of
    /// the static sets.
    pub fn of_with_overrides(bundle_id: &str, settings: &AppSettings) -> AppClass {
        if settings.extra_terminal_apps.iter().any(|b| b == bundle_id) {
            return AppClass::Terminal;
        }
        if settings.extra_browser_apps.iter().any(|b| b == bundle_id) {
            return AppClass::Browser;
        }
        if settings.extra_electron_apps.iter().any(|b| b == bundle_id) {
            return AppClass::Electron;
        }
        AppClass::of(bundle_id)
    }
}

/// Identity of the application that currently has the keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmostApp {
    pub pid: i32,
    pub bundle_id: Option<String>,
    pub name: Option<String>,
}

impl FrontmostApp {
    pub fn class(&self, settings: &AppSettings) -> AppClass {
        self.bundle_id
            .as_deref()
            .map(|id| AppClass::of_with_overrides(id, settings))
            .unwrap_or(AppClass::Native)
    }
}

/// Query the frontmost application via NSWorkspace.
#[cfg(target_os = "macos")]
pub fn frontmost_app() -> Option<FrontmostApp> {
    use objc2::rc::Retained;
    use objc2::runtime::AnyObject;
    use objc2::{class, msg_send};
    use objc2_foundation::NSString;

    unsafe {
        let workspace: Retained<AnyObject> = msg_send![class!(NSWorkspace), sharedWorkspace];
        let app: Option<Retained<AnyObject>> = msg_send![&*workspace, frontmostApplication];
        let app = app?;

        let pid: i32 = msg_send![&*app, processIdentifier];
        let bundle_id: Option<Retained<NSString>> = msg_send![&*app, bundleIdentifier];
        let name: Option<Retained<NSString>> = msg_send![&*app, localizedName];

        Some(FrontmostApp {
            pid,
            bundle_id: bundle_id.map(|s| s.to_string()),
            name: name.map(|s| s.to_string()),
        })
    }
}

/// Stub for non-macOS platforms.
#[cfg(not(target_os = "macos"))]
pub fn frontmost_app() -> Option<FrontmostApp> {
    None
}

#[cfg(target_os = "macos")]
impl FrontmostApp {
    /// Re-activate this application. The synthetic-keystroke insertion
    /// tier types into whatever holds focus, so the host must be brought
    /// back to front immediately before that tier runs.
    pub fn activate(&self) -> bool {
        use objc2::rc::Retained;
        use objc2::runtime::AnyObject;
        use objc2::{class, msg_send};

        // NSApplicationActivateIgnoringOtherApps
        const ACTIVATE_IGNORING_OTHER_APPS: usize = 1 << 1;

        unsafe {
            let app: Option<Retained<AnyObject>> = msg_send![
                class!(NSRunningApplication),
                runningApplicationWithProcessIdentifier: self.pid
            ];
            match app {
                Some(app) => {
                    msg_send![&*app, activateWithOptions: ACTIVATE_IGNORING_OTHER_APPS]
                }
                None => false,
            }
        }
    }
}

#[cfg(not(target_os = "macos"))]
impl FrontmostApp {
    pub fn activate(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_browsers_classify_as_browser() {
        assert_eq!(AppClass::of("com.apple.Safari"), AppClass::Browser);
        assert_eq!(AppClass::of("com.google.Chrome"), AppClass::Browser);
        assert_eq!(AppClass::of("org.mozilla.firefox"), AppClass::Browser);
    }

    #[test]
    fn known_electron_apps_classify_as_electron() {
        assert_eq!(AppClass::of("com.microsoft.VSCode"), AppClass::Electron);
        assert_eq!(AppClass::of("com.tinyspeck.slackmacgap"), AppClass::Electron);
    }

    #[test]
    fn known_terminals_classify_as_terminal() {
        assert_eq!(AppClass::of("com.apple.Terminal"), AppClass::Terminal);
        assert_eq!(AppClass::of("com.googlecode.iterm2"), AppClass::Terminal);
    }

    #[test]
    fn unknown_bundles_default_to_native() {
        assert_eq!(AppClass::of("com.apple.TextEdit"), AppClass::Native);
        assert_eq!(AppClass::of(""), AppClass::Native);
        assert_eq!(AppClass::of("com.example.not-a-real-app"), AppClass::Native);
    }

    #[test]
    fn settings_overlays_extend_the_static_sets() {
        let mut settings = AppSettings::default();
        settings.extra_terminal_apps.push("com.example.myterm".into());
        assert_eq!(
            AppClass::of_with_overrides("com.example.myterm", &settings),
            AppClass::Terminal
        );
        // Overlays never shadow an unrelated bundle.
        assert_eq!(
            AppClass::of_with_overrides("com.apple.Safari", &settings),
            AppClass::Browser
        );
    }

    #[test]
    fn app_without_bundle_id_is_native() {
        let app = FrontmostApp {
            pid: 123,
            bundle_id: None,
            name: Some("mystery".into()),
        };
        assert_eq!(app.class(&AppSettings::default()), AppClass::Native);
    }
}
