//! ASCII-to-virtual-keycode mapping for the synthetic keystroke tier.
//!
//! Codes are ANSI-layout macOS virtual keycodes (the kVK_ANSI_* values
//! from Carbon's Events.h). Raw keycodes are used instead of character
//! events because character lookup goes through the text services
//! manager, which only works on the main dispatch queue. Only the ASCII
//! printable range is covered; anything else is reported unmapped and
//! skipped by the caller.

/// One physical key press: the virtual keycode and whether Shift is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub code: u32,
    pub shifted: bool,
}

const fn plain(code: u32) -> Option<KeyStroke> {
    Some(KeyStroke {
        code,
        shifted: false,
    })
}

const fn shifted(code: u32) -> Option<KeyStroke> {
    Some(KeyStroke {
        code,
        shifted: true,
    })
}

/// Virtual keycode for the Delete (backspace) key.
pub const KEY_DELETE: u32 = 0x33;
/// Virtual keycode for 'W', used for the Ctrl-W backward-word-delete
/// control sequence in terminal-class hosts.
pub const KEY_W: u32 = 0x0D;
/// Virtual keycode for 'V', used for the Cmd-V paste chord.
pub const KEY_V: u32 = 0x09;
/// Virtual keycode for 'C', used for the Cmd-C copy chord.
pub const KEY_C: u32 = 0x08;

/// Map an ASCII character to the key press that produces it on an ANSI
/// layout. `None` for everything outside the supported range.
pub fn ascii_keystroke(c: char) -> Option<KeyStroke> {
    match c {
        'a' => plain(0x00),
        's' => plain(0x01),
        'd' => plain(0x02),
        'f' => plain(0x03),
        'h' => plain(0x04),
        'g' => plain(0x05),
        'z' => plain(0x06),
        'x' => plain(0x07),
        'c' => plain(0x08),
        'v' => plain(0x09),
        'b' => plain(0x0B),
        'q' => plain(0x0C),
        'w' => plain(0x0D),
        'e' => plain(0x0E),
        'r' => plain(0x0F),
        'y' => plain(0x10),
        't' => plain(0x11),
        'o' => plain(0x1F),
        'u' => plain(0x20),
        'i' => plain(0x22),
        'p' => plain(0x23),
        'l' => plain(0x25),
        'j' => plain(0x26),
        'k' => plain(0x28),
        'n' => plain(0x2D),
        'm' => plain(0x2E),

        'A' => shifted(0x00),
        'S' => shifted(0x01),
        'D' => shifted(0x02),
        'F' => shifted(0x03),
        'H' => shifted(0x04),
        'G' => shifted(0x05),
        'Z' => shifted(0x06),
        'X' => shifted(0x07),
        'C' => shifted(0x08),
        'V' => shifted(0x09),
        'B' => shifted(0x0B),
        'Q' => shifted(0x0C),
        'W' => shifted(0x0D),
        'E' => shifted(0x0E),
        'R' => shifted(0x0F),
        'Y' => shifted(0x10),
        'T' => shifted(0x11),
        'O' => shifted(0x1F),
        'U' => shifted(0x20),
        'I' => shifted(0x22),
        'P' => shifted(0x23),
        'L' => shifted(0x25),
        'J' => shifted(0x26),
        'K' => shifted(0x28),
        'N' => shifted(0x2D),
        'M' => shifted(0x2E),

        '1' => plain(0x12),
        '2' => plain(0x13),
        '3' => plain(0x14),
        '4' => plain(0x15),
        '6' => plain(0x16),
        '5' => plain(0x17),
        '9' => plain(0x19),
        '7' => plain(0x1A),
        '8' => plain(0x1C),
        '0' => plain(0x1D),

        '!' => shifted(0x12),
        '@' => shifted(0x13),
        '#' => shifted(0x14),
        '$' => shifted(0x15),
        '^' => shifted(0x16),
        '%' => shifted(0x17),
        '(' => shifted(0x19),
        '&' => shifted(0x1A),
        '*' => shifted(0x1C),
        ')' => shifted(0x1D),

        '=' => plain(0x18),
        '-' => plain(0x1B),
        ']' => plain(0x1E),
        '[' => plain(0x21),
        '\'' => plain(0x27),
        ';' => plain(0x29),
        '\\' => plain(0x2A),
        ',' => plain(0x2B),
        '/' => plain(0x2C),
        '.' => plain(0x2F),
        '`' => plain(0x32),

        '+' => shifted(0x18),
        '_' => shifted(0x1B),
        '}' => shifted(0x1E),
        '{' => shifted(0x21),
        '"' => shifted(0x27),
        ':' => shifted(0x29),
        '|' => shifted(0x2A),
        '<' => shifted(0x2B),
        '?' => shifted(0x2C),
        '>' => shifted(0x2F),
        '~' => shifted(0x32),

        ' ' => plain(0x31),
        '\t' => plain(0x30),
        '\n' | '\r' => plain(0x24),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_ascii_printable_is_mapped() {
        for byte in 0x20u8..0x7F {
            let c = byte as char;
            assert!(
                ascii_keystroke(c).is_some(),
                "printable ASCII {:?} has no keystroke",
                c
            );
        }
    }

    #[test]
    fn uppercase_shares_keycode_with_lowercase() {
        for c in 'a'..='z' {
            let lower = ascii_keystroke(c).unwrap();
            let upper = ascii_keystroke(c.to_ascii_uppercase()).unwrap();
            assert_eq!(lower.code, upper.code);
            assert!(!lower.shifted);
            assert!(upper.shifted);
        }
    }

    #[test]
    fn shifted_digit_symbols_share_keycodes() {
        let pairs = [
            ('1', '!'),
            ('2', '@'),
            ('3', '#'),
            ('4', '$'),
            ('5', '%'),
            ('6', '^'),
            ('7', '&'),
            ('8', '*'),
            ('9', '('),
            ('0', ')'),
        ];
        for (digit, symbol) in pairs {
            let d = ascii_keystroke(digit).unwrap();
            let s = ascii_keystroke(symbol).unwrap();
            assert_eq!(d.code, s.code, "{} vs {}", digit, symbol);
            assert!(!d.shifted);
            assert!(s.shifted);
        }
    }

    #[test]
    fn non_ascii_is_unmapped() {
        assert_eq!(ascii_keystroke('é'), None);
        assert_eq!(ascii_keystroke('中'), None);
        assert_eq!(ascii_keystroke('🙂'), None);
        assert_eq!(ascii_keystroke('\u{7f}'), None);
    }

    #[test]
    fn chord_keycodes_match_the_table() {
        assert_eq!(ascii_keystroke('v').unwrap().code, KEY_V);
        assert_eq!(ascii_keystroke('c').unwrap().code, KEY_C);
        assert_eq!(ascii_keystroke('w').unwrap().code, KEY_W);
    }
}
