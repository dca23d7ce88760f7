//! Spelling completions from the system dictionary, behind a provider
//! trait with a results cache.
//!
//! The engine only ever sees `CompletionProvider`; the concrete lookup
//! goes through NSSpellChecker, whose partial-word completion API is the
//! same one the system uses for Option-Escape completion in native text
//! views.

use std::collections::HashMap;

use tracing::debug;

/// Ranked completion candidates for a partial word.
pub trait CompletionProvider {
    fn completions(&mut self, partial_word: &str, language: Option<&str>) -> Vec<String>;
}

/// Memoizing wrapper around any provider. Dictionary lookups are pure
/// for a given (word, language) pair, so repeated triggers on the same
/// partial word skip the system round trip. The cache is wiped
/// wholesale at capacity rather than tracking recency; lookups are
/// cheap enough that a cold restart costs little.
pub struct CachedCompletions<P> {
    inner: P,
    cache: HashMap<(String, Option<String>), Vec<String>>,
    capacity: usize,
}

impl<P: CompletionProvider> CachedCompletions<P> {
    pub fn new(inner: P, capacity: usize) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl<P: CompletionProvider> CompletionProvider for CachedCompletions<P> {
    fn completions(&mut self, partial_word: &str, language: Option<&str>) -> Vec<String> {
        let key = (partial_word.to_string(), language.map(str::to_string));
        if let Some(hit) = self.cache.get(&key) {
            debug!(word = partial_word, "Completion cache hit");
            return hit.clone();
        }

        let results = self.inner.completions(partial_word, language);
        if self.cache.len() >= self.capacity {
            debug!(entries = self.cache.len(), "Completion cache full, clearing");
            self.cache.clear();
        }
        self.cache.insert(key, results.clone());
        results
    }
}

/// The system spell checker.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpellChecker;

impl SystemSpellChecker {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "macos")]
impl CompletionProvider for SystemSpellChecker {
    fn completions(&mut self, partial_word: &str, language: Option<&str>) -> Vec<String> {
        use objc2::rc::Retained;
        use objc2::runtime::AnyObject;
        use objc2::{class, msg_send};
        use objc2_foundation::{NSRange, NSString};

        if partial_word.is_empty() {
            return Vec::new();
        }

        unsafe {
            let checker: Retained<AnyObject> =
                msg_send![class!(NSSpellChecker), sharedSpellChecker];

            let word = NSString::from_str(partial_word);
            let range = NSRange {
                location: 0,
                length: partial_word.encode_utf16().count(),
            };
            let language_ns = language.map(NSString::from_str);

            let completions: Option<Retained<AnyObject>> = msg_send![
                &*checker,
                completionsForPartialWordRange: range,
                inString: &*word,
                language: language_ns.as_deref(),
                inSpellDocumentWithTag: 0isize
            ];

            let Some(completions) = completions else {
                return Vec::new();
            };
            let count: usize = msg_send![&*completions, count];
            let mut results = Vec::with_capacity(count);
            for index in 0..count {
                let candidate: Retained<NSString> =
                    msg_send![&*completions, objectAtIndex: index];
                results.push(candidate.to_string());
            }
            debug!(
                word = partial_word,
                candidates = results.len(),
                "Spell checker completions"
            );
            results
        }
    }
}

/// Stub for non-macOS platforms.
#[cfg(not(target_os = "macos"))]
impl CompletionProvider for SystemSpellChecker {
    fn completions(&mut self, _partial_word: &str, _language: Option<&str>) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingProvider {
        calls: Rc<Cell<usize>>,
    }

    impl CompletionProvider for CountingProvider {
        fn completions(&mut self, partial_word: &str, _language: Option<&str>) -> Vec<String> {
            self.calls.set(self.calls.get() + 1);
            vec![format!("{}e", partial_word), format!("{}ing", partial_word)]
        }
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let calls = Rc::new(Cell::new(0));
        let mut cached = CachedCompletions::new(
            CountingProvider {
                calls: calls.clone(),
            },
            16,
        );

        let first = cached.completions("hav", None);
        let second = cached.completions("hav", None);
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(cached.cached_entries(), 1);
    }

    #[test]
    fn language_is_part_of_the_cache_key() {
        let calls = Rc::new(Cell::new(0));
        let mut cached = CachedCompletions::new(
            CountingProvider {
                calls: calls.clone(),
            },
            16,
        );

        cached.completions("hav", None);
        cached.completions("hav", Some("en_US"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn cache_clears_at_capacity_instead_of_growing() {
        let calls = Rc::new(Cell::new(0));
        let mut cached = CachedCompletions::new(
            CountingProvider {
                calls: calls.clone(),
            },
            2,
        );

        cached.completions("a", None);
        cached.completions("b", None);
        cached.completions("c", None); // wipes, then inserts "c"
        assert!(cached.cached_entries() <= 2);
        // "a" was evicted with the wipe, so this is a fresh call.
        cached.completions("a", None);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn clear_empties_the_cache() {
        let calls = Rc::new(Cell::new(0));
        let mut cached = CachedCompletions::new(
            CountingProvider {
                calls: calls.clone(),
            },
            16,
        );
        cached.completions("hav", None);
        cached.clear();
        assert_eq!(cached.cached_entries(), 0);
        cached.completions("hav", None);
        assert_eq!(calls.get(), 2);
    }
}
