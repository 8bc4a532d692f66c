//! Script text normalization.
//!
//! Typographic punctuation (curly quotes, em-dashes, ellipsis) makes the
//! downstream speech path produce garbled phonemes, so scripts are
//! canonicalized to plain ASCII equivalents before planning.

/// Normalize a raw script to its ASCII-punctuation form.
///
/// The function is pure and idempotent: `normalize_script(normalize_script(s))
/// == normalize_script(s)`.
pub fn normalize_script(script: &str) -> String {
    let mut out = String::with_capacity(script.len());

    for ch in script.chars() {
        match ch {
            // Curly single quotes and related apostrophes
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            // Curly double quotes
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
            // Dashes: em, en, horizontal bar, minus sign
            '\u{2014}' | '\u{2013}' | '\u{2015}' | '\u{2212}' => out.push_str(" - "),
            // Ellipsis
            '\u{2026}' => out.push_str("..."),
            // Non-breaking and narrow spaces
            '\u{00A0}' | '\u{202F}' | '\u{2009}' => out.push(' '),
            // Zero-width characters are dropped outright
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => {}
            other => out.push(other),
        }
    }

    // Collapse runs of spaces introduced by dash expansion, then trim.
    let mut collapsed = String::with_capacity(out.len());
    let mut prev_space = false;
    for ch in out.chars() {
        if ch == ' ' {
            if !prev_space {
                collapsed.push(ch);
            }
            prev_space = true;
        } else {
            collapsed.push(ch);
            prev_space = false;
        }
    }

    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curly_quotes_become_ascii() {
        assert_eq!(normalize_script("\u{2018}hi\u{2019}"), "'hi'");
        assert_eq!(normalize_script("\u{201C}hi\u{201D}"), "\"hi\"");
    }

    #[test]
    fn test_em_dash_becomes_spaced_hyphen() {
        assert_eq!(normalize_script("fast\u{2014}really fast"), "fast - really fast");
    }

    #[test]
    fn test_ellipsis_expansion() {
        assert_eq!(normalize_script("wait\u{2026} what"), "wait... what");
    }

    #[test]
    fn test_plain_ascii_unchanged() {
        let s = "Buy now. It's great - \"really\".";
        assert_eq!(normalize_script(s), s);
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "A\u{2014}B\u{2026} \u{201C}C\u{201D}",
            "  padded  ",
            "plain text",
            "mixed \u{2019}quotes\u{2014}and dashes\u{2026}",
        ];
        for input in inputs {
            let once = normalize_script(input);
            assert_eq!(normalize_script(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_whitespace_collapsed_and_trimmed() {
        assert_eq!(normalize_script("  a\u{00A0}\u{00A0}b  "), "a b");
    }
}
