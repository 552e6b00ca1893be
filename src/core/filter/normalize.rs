// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text normalization shared by keyword storage and message filtering.

/// Lowercase, trim, and convert full-width ASCII to half-width.
///
/// Full-width forms U+FF01..=U+FF5E map to U+0021..=U+007E and the
/// ideographic space U+3000 becomes an ASCII space. Applied both to keywords
/// on insertion and to messages before matching, so matching is insensitive
/// to case and character width.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().trim().chars().map(to_halfwidth).collect()
}

fn to_halfwidth(c: char) -> char {
    match c {
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        '\u{3000}' => ' ',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_and_trim() {
        assert_eq!(normalize("  Hello World  "), "hello world");
    }

    #[test]
    fn test_fullwidth_ascii_converted() {
        assert_eq!(normalize("ＡＢＣ１２３"), "abc123");
        assert_eq!(normalize("ｈｅｌｌｏ！"), "hello!");
    }

    #[test]
    fn test_ideographic_space_converted() {
        assert_eq!(normalize("a\u{3000}b"), "a b");
    }

    #[test]
    fn test_non_ascii_passthrough() {
        assert_eq!(normalize("こんにちは"), "こんにちは");
    }

    #[test]
    fn test_empty_after_normalization() {
        assert_eq!(normalize("   "), "");
    }
}
