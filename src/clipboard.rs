//! Clipboard snapshot/restore around clipboard-mediated operations.
//!
//! The pasteboard is shared with every other process on the machine, so
//! any tier that stages text on it must put the user's content back no
//! matter how the operation ends. `ClipboardTransaction` holds the
//! snapshot and restores on drop, which covers early returns and panics;
//! a hard kill between snapshot and restore still loses the contents --
//! a known, accepted risk. No lock is (or can be) held while the host
//! processes the paste, so a concurrent user copy during that window can
//! race the restore.

use tracing::debug;

/// Everything on the pasteboard, as (type UTI, raw bytes) pairs in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClipboardSnapshot {
    pub items: Vec<(String, Vec<u8>)>,
}

impl ClipboardSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(ty, _)| ty.as_str())
    }
}

/// The pasteboard surface the insertion engine talks to. Trait-shaped so
/// tests can run the full transaction discipline against an in-memory
/// board.
pub trait Pasteboard {
    /// Snapshot every item currently on the board.
    fn capture(&mut self) -> ClipboardSnapshot;
    /// Replace the board's contents with a snapshot.
    fn restore(&mut self, snapshot: &ClipboardSnapshot);
    /// Replace the board's contents with plain text.
    fn set_text(&mut self, text: &str) -> bool;
    /// Read the board's plain-text item, if any.
    fn text(&mut self) -> Option<String>;
}

/// RAII snapshot of the pasteboard: captures on construction, restores on
/// drop unless dismissed.
pub struct ClipboardTransaction<'a> {
    board: &'a mut dyn Pasteboard,
    snapshot: ClipboardSnapshot,
    restored: bool,
}

impl<'a> ClipboardTransaction<'a> {
    pub fn begin(board: &'a mut dyn Pasteboard) -> Self {
        let snapshot = board.capture();
        debug!(types = snapshot.items.len(), "Captured clipboard snapshot");
        Self {
            board,
            snapshot,
            restored: false,
        }
    }

    pub fn board(&mut self) -> &mut dyn Pasteboard {
        &mut *self.board
    }

    /// Restore now instead of at drop time, for callers that want the
    /// restore sequenced before their own settling delay ends.
    pub fn restore_now(mut self) {
        self.do_restore();
    }

    fn do_restore(&mut self) {
        if self.restored {
            return;
        }
        self.board.restore(&self.snapshot);
        self.restored = true;
        debug!("Restored clipboard snapshot");
    }
}

impl Drop for ClipboardTransaction<'_> {
    fn drop(&mut self) {
        self.do_restore();
    }
}

pub const PLAIN_TEXT_TYPE: &str = "public.utf8-plain-text";

/// The system pasteboard (NSPasteboard.generalPasteboard).
#[cfg(target_os = "macos")]
pub struct SystemPasteboard;

#[cfg(target_os = "macos")]
mod macos {
    use objc2::rc::Retained;
    use objc2::runtime::AnyObject;
    use objc2::{class, msg_send};
    use objc2_foundation::{NSData, NSString};

    use super::{ClipboardSnapshot, Pasteboard, SystemPasteboard, PLAIN_TEXT_TYPE};
    use tracing::warn;

    impl SystemPasteboard {
        pub fn new() -> Self {
            Self
        }
    }

    impl Default for SystemPasteboard {
        fn default() -> Self {
            Self::new()
        }
    }

    fn general_pasteboard() -> Retained<AnyObject> {
        unsafe { msg_send![class!(NSPasteboard), generalPasteboard] }
    }

    impl Pasteboard for SystemPasteboard {
        fn capture(&mut self) -> ClipboardSnapshot {
            let mut items = Vec::new();
            unsafe {
                let pasteboard = general_pasteboard();
                let types: Option<Retained<AnyObject>> = msg_send![&*pasteboard, types];
                let Some(types) = types else {
                    return ClipboardSnapshot { items };
                };
                let count: usize = msg_send![&*types, count];
                for index in 0..count {
                    let ty: Retained<NSString> = msg_send![&*types, objectAtIndex: index];
                    let data: Option<Retained<NSData>> =
                        msg_send![&*pasteboard, dataForType: &*ty];
                    if let Some(data) = data {
                        let len: usize = msg_send![&*data, length];
                        let bytes: *const std::ffi::c_void = msg_send![&*data, bytes];
                        let raw = if bytes.is_null() || len == 0 {
                            Vec::new()
                        } else {
                            std::slice::from_raw_parts(bytes as *const u8, len).to_vec()
                        };
                        items.push((ty.to_string(), raw));
                    }
                }
            }
            ClipboardSnapshot { items }
        }

        fn restore(&mut self, snapshot: &ClipboardSnapshot) {
            unsafe {
                let pasteboard = general_pasteboard();
                let _: isize = msg_send![&*pasteboard, clearContents];
                for (ty, raw) in &snapshot.items {
                    let ty = NSString::from_str(ty);
                    let data = NSData::with_bytes(raw);
                    let ok: bool = msg_send![&*pasteboard, setData: &*data, forType: &*ty];
                    if !ok {
                        warn!(pasteboard_type = %ty, "Failed to restore clipboard item");
                    }
                }
            }
        }

        fn set_text(&mut self, text: &str) -> bool {
            unsafe {
                let pasteboard = general_pasteboard();
                let _: isize = msg_send![&*pasteboard, clearContents];
                let ty = NSString::from_str(PLAIN_TEXT_TYPE);
                let value = NSString::from_str(text);
                msg_send![&*pasteboard, setString: &*value, forType: &*ty]
            }
        }

        fn text(&mut self) -> Option<String> {
            unsafe {
                let pasteboard = general_pasteboard();
                let ty = NSString::from_str(PLAIN_TEXT_TYPE);
                let value: Option<Retained<NSString>> =
                    msg_send![&*pasteboard, stringForType: &*ty];
                value.map(|s| s.to_string())
            }
        }
    }
}

/// In-memory pasteboard used by tests (and as the stub board on
/// non-macOS platforms).
#[derive(Debug, Default)]
pub struct MemoryPasteboard {
    items: Vec<(String, Vec<u8>)>,
}

impl MemoryPasteboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        let mut board = Self::new();
        board.set_text(text);
        board
    }
}

impl Pasteboard for MemoryPasteboard {
    fn capture(&mut self) -> ClipboardSnapshot {
        ClipboardSnapshot {
            items: self.items.clone(),
        }
    }

    fn restore(&mut self, snapshot: &ClipboardSnapshot) {
        self.items = snapshot.items.clone();
    }

    fn set_text(&mut self, text: &str) -> bool {
        self.items = vec![(PLAIN_TEXT_TYPE.to_string(), text.as_bytes().to_vec())];
        true
    }

    fn text(&mut self) -> Option<String> {
        self.items.iter().find_map(|(ty, raw)| {
            (ty == PLAIN_TEXT_TYPE)
                .then(|| String::from_utf8(raw.clone()).ok())
                .flatten()
        })
    }
}

/// The pasteboard the engine should use on this platform.
#[cfg(target_os = "macos")]
pub fn system_pasteboard() -> SystemPasteboard {
    SystemPasteboard::new()
}

#[cfg(not(target_os = "macos"))]
pub fn system_pasteboard() -> MemoryPasteboard {
    tracing::warn!("No system pasteboard on this platform, using an in-memory board");
    MemoryPasteboard::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rich_board() -> MemoryPasteboard {
        MemoryPasteboard {
            items: vec![
                (PLAIN_TEXT_TYPE.to_string(), b"the user's text".to_vec()),
                ("public.rtf".to_string(), b"{\\rtf1 hi}".to_vec()),
                ("com.example.custom".to_string(), vec![0, 159, 146, 150]),
            ],
        }
    }

    #[test]
    fn transaction_restores_after_mediated_operation() {
        let mut board = rich_board();
        let before = board.capture();

        {
            let mut txn = ClipboardTransaction::begin(&mut board);
            txn.board().set_text("completion");
            assert_eq!(txn.board().text().as_deref(), Some("completion"));
            txn.restore_now();
        }

        assert_eq!(board.capture(), before);
    }

    #[test]
    fn transaction_restores_on_drop_when_operation_bails_early() {
        let mut board = rich_board();
        let before = board.capture();

        {
            let mut txn = ClipboardTransaction::begin(&mut board);
            txn.board().set_text("half-done");
            // Dropped without restore_now: an early return path.
        }

        assert_eq!(board.capture(), before);
    }

    #[test]
    fn transaction_restores_even_when_the_operation_panics() {
        let mut board = rich_board();
        let before = board.capture();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut txn = ClipboardTransaction::begin(&mut board);
            txn.board().set_text("about to explode");
            panic!("mediated operation failed");
        }));
        assert!(result.is_err());

        assert_eq!(board.capture(), before);
    }

    #[test]
    fn empty_board_round_trips() {
        let mut board = MemoryPasteboard::new();
        let before = board.capture();
        assert!(before.is_empty());

        {
            let mut txn = ClipboardTransaction::begin(&mut board);
            txn.board().set_text("something");
        }

        assert_eq!(board.capture(), before);
    }

    #[test]
    fn snapshot_preserves_item_order_and_bytes() {
        let mut board = rich_board();
        let snapshot = board.capture();
        let types: Vec<&str> = snapshot.types().collect();
        assert_eq!(
            types,
            vec![PLAIN_TEXT_TYPE, "public.rtf", "com.example.custom"]
        );
        assert_eq!(snapshot.items[2].1, vec![0, 159, 146, 150]);
    }

    #[test]
    fn memory_board_text_round_trip() {
        let mut board = MemoryPasteboard::with_text("hello");
        assert_eq!(board.text().as_deref(), Some("hello"));
    }
}
