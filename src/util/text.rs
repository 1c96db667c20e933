// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Case heuristics for the batch case toggle.
//!
//! "All caps" means the text equals its own uppercasing and differs from
//! its lowercasing (so there is at least one cased letter). Sentence
//! casing capitalizes the first letter and any letter directly following
//! sentence-ending punctuation plus whitespace. Behavior on mixed-script
//! text follows whatever Unicode case mapping does.

/// Whether the text is entirely uppercase (and contains cased letters).
pub fn is_all_uppercase(text: &str) -> bool {
    !text.is_empty() && text == text.to_uppercase() && text != text.to_lowercase()
}

/// Lowercase the text, then capitalize sentence starts.
pub fn to_sentence_case(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut out = String::with_capacity(lower.len());

    // Capitalize the first letter, and a letter reached through
    // sentence-ending punctuation followed by whitespace
    let mut capitalize_next = true;
    let mut after_stop = false;
    let mut armed = false;

    for ch in lower.chars() {
        if capitalize_next && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
            capitalize_next = false;
            after_stop = false;
            armed = false;
            continue;
        }
        if armed {
            if ch.is_whitespace() {
                // Any amount of whitespace after the stop keeps the arm
                out.push(ch);
                continue;
            }
            // First non-whitespace char after ". " — capitalize only letters
            if ch.is_alphabetic() {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            armed = false;
            after_stop = false;
            continue;
        }
        if matches!(ch, '.' | '!' | '?') {
            after_stop = true;
            capitalize_next = false;
        } else if ch.is_whitespace() {
            if after_stop {
                armed = true;
            }
        } else {
            after_stop = false;
            if capitalize_next && !ch.is_whitespace() {
                // Leading non-letter cancels initial capitalization
                capitalize_next = false;
            }
        }
        out.push(ch);
    }
    out
}

/// Toggle between all-uppercase and sentence case.
pub fn toggle_case(text: &str, currently_all_upper: bool) -> String {
    if currently_all_upper {
        to_sentence_case(text)
    } else {
        text.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_uppercase_detection() {
        assert!(is_all_uppercase("HELLO THERE!"));
        assert!(is_all_uppercase("ПРИВЕТ"));
        assert!(!is_all_uppercase("Hello"));
        assert!(!is_all_uppercase(""));
        // No cased letters at all
        assert!(!is_all_uppercase("123 !?"));
    }

    #[test]
    fn test_sentence_case_basics() {
        assert_eq!(to_sentence_case("HELLO THERE"), "Hello there");
        assert_eq!(
            to_sentence_case("STOP! WHO GOES? NOBODY."),
            "Stop! Who goes? Nobody."
        );
    }

    #[test]
    fn test_sentence_case_leading_whitespace() {
        assert_eq!(to_sentence_case("  WAIT HERE"), "  Wait here");
    }

    #[test]
    fn test_sentence_case_multiple_spaces_after_stop() {
        assert_eq!(to_sentence_case("STOP!  GO NOW"), "Stop!  Go now");
    }

    #[test]
    fn test_sentence_case_cyrillic() {
        assert_eq!(to_sentence_case("ЧТО? НЕТ."), "Что? Нет.");
    }

    #[test]
    fn test_toggle_roundtrip_shape() {
        let upper = toggle_case("Some dialogue. More!", false);
        assert_eq!(upper, "SOME DIALOGUE. MORE!");
        let back = toggle_case(&upper, true);
        assert_eq!(back, "Some dialogue. More!");
    }

    #[test]
    fn test_punctuation_without_space_does_not_capitalize() {
        // Regex in the source heuristic requires whitespace after the stop
        assert_eq!(to_sentence_case("E.G. THIS"), "E.g. This");
    }
}
