//! crates/configmate_core/src/normalize.rs
//!
//! Canonicalizes a raw question into the key used for answer-cache equality.

use unicode_normalization::UnicodeNormalization;

/// The Thai block. Questions are expected in Thai or English.
const THAI_BLOCK: std::ops::RangeInclusive<char> = '\u{0E00}'..='\u{0E7F}';

fn is_allowed(c: char) -> bool {
    THAI_BLOCK.contains(&c) || c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '
}

/// Produces the normalized key for `text`.
///
/// NFKC first, then lowercase, so compatibility forms (full-width letters,
/// ligatures) fold into plain ASCII before filtering. Every character outside
/// the allowed alphabet becomes a space, and runs of spaces collapse to one.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfkc()
        .flat_map(char::to_lowercase)
        .map(|c| if is_allowed(c) { c } else { ' ' })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_case_punctuation_and_spacing() {
        assert_eq!(normalize("What is X?"), normalize("what is x"));
        assert_eq!(normalize("  Hello,   WORLD!!  "), "hello world");
        assert_eq!(normalize("router\tconfig\nsetup"), "router config setup");
    }

    #[test]
    fn folds_full_width_forms() {
        assert_eq!(normalize("ＶＬＡＮ　１０"), "vlan 10");
    }

    #[test]
    fn keeps_thai_text() {
        assert_eq!(normalize("ตั้งค่า VLAN ยังไง?"), "ตั้งค่า vlan ยังไง");
    }

    #[test]
    fn strips_other_scripts_and_symbols() {
        assert_eq!(normalize("¿Qué tal? 🙂"), "qu tal");
        assert_eq!(normalize("!!!"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "What is X?",
            "ＡＢＣ　ｄｅｆ",
            "ℌello ﬁle",
            "ตั้งค่า   VLAN ยังไง?",
            "Straße İstanbul",
            "  \u{0E33}ไร  ",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }
}
