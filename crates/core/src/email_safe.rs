//! Email-safe and id-safe name normalisation.
//!
//! The Notify API treats the derived sender local part (`email_from`) as a
//! uniqueness key, so the output here must match what the API and every other
//! Notify client compute for the same display name, character for character.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static REPEATED_DOTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}").expect("valid regex"));

/// `.-.` and `._.` collapse to their middle character.
static DOT_WRAPPED_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\.)(-|_)(\.)").expect("valid regex"));

/// A run of separators collapses to the last separator of the run.
static SEPARATOR_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\.|-|_){2,}").expect("valid regex"));

/// Derive the email-safe local part for a service sender address.
///
/// `"Héllo   World!!"` becomes `"hello.world"`.
pub fn email_safe(value: &str) -> String {
    email_safe_with(value, '.')
}

/// Derive a URL/id-safe identifier, using `-` between words.
pub fn id_safe(value: &str) -> String {
    email_safe_with(value, '-')
}

/// Strip double quotes from a display name used in a `From:` header.
pub fn email_safe_name(value: &str) -> String {
    value.replace('"', "").trim().to_string()
}

/// Normalise `value`, joining whitespace-separated words with `whitespace`.
///
/// Steps, in order:
/// 1. NFD decomposition with combining marks removed (accents, diacritics).
/// 2. Trim, then turn every whitespace run into `whitespace`.
/// 3. Keep lower-cased alphanumerics plus `whitespace`, `-` and `_`.
/// 4. Collapse repeated dots, `.-.`/`._.`, and any separator run.
/// 5. Strip leading and trailing dots.
pub fn email_safe_with(value: &str, whitespace: char) -> String {
    let stripped: String = value.nfd().filter(|c| !is_combining_mark(*c)).collect();

    let joiner = whitespace.to_string();
    let joined = WHITESPACE_RE.replace_all(stripped.trim(), NoExpand(&joiner));

    let filtered: String = joined
        .chars()
        .flat_map(|c| {
            let keep = c.is_alphanumeric() || c == whitespace || c == '-' || c == '_';
            keep.then(|| c.to_lowercase()).into_iter().flatten()
        })
        .collect();

    let collapsed = REPEATED_DOTS_RE.replace_all(&filtered, ".");
    let collapsed = DOT_WRAPPED_SEPARATOR_RE.replace_all(&collapsed, "$2");
    let collapsed = SEPARATOR_RUN_RE.replace_all(&collapsed, "$1");

    collapsed.trim_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_spaces_and_punctuation() {
        assert_eq!(email_safe("Héllo   World!!"), "hello.world");
    }

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(email_safe("  My Service  "), "my.service");
        assert_eq!(email_safe("ÜNÏCÖDÉ"), "unicode");
    }

    #[test]
    fn drops_apostrophes_inside_words() {
        assert_eq!(
            email_safe("Département de l'Éducation"),
            "departement.de.leducation"
        );
    }

    #[test]
    fn collapses_repeated_dots() {
        assert_eq!(email_safe("a..b"), "a.b");
        assert_eq!(email_safe("a....b"), "a.b");
    }

    #[test]
    fn dot_wrapped_separator_becomes_separator() {
        assert_eq!(email_safe("a.-.b"), "a-b");
        assert_eq!(email_safe("a._.b"), "a_b");
        assert_eq!(email_safe("a - b"), "a-b");
    }

    #[test]
    fn mixed_separator_run_keeps_last_separator() {
        assert_eq!(email_safe("a-_b"), "a_b");
        assert_eq!(email_safe("a_-b"), "a-b");
        assert_eq!(email_safe("test_-_name"), "test_name");
    }

    #[test]
    fn only_dots_are_trimmed_from_the_ends() {
        assert_eq!(email_safe("...lead"), "lead");
        assert_eq!(email_safe("trail!!"), "trail");
        assert_eq!(email_safe("name-"), "name-");
        assert_eq!(email_safe("_name"), "_name");
    }

    #[test]
    fn separator_run_ending_in_dot_is_trimmed() {
        assert_eq!(email_safe("name -"), "name-");
        assert_eq!(email_safe("name-."), "name");
    }

    #[test]
    fn empty_and_symbol_only_inputs_are_empty() {
        assert_eq!(email_safe(""), "");
        assert_eq!(email_safe("   "), "");
        assert_eq!(email_safe("!!!"), "");
    }

    #[test]
    fn email_safe_is_idempotent() {
        for input in [
            "Héllo   World!!",
            "a.-.b",
            "a-_b",
            "  Service des Impôts -- Québec ",
            "x . y _ z",
            "name-.",
            "Ministère  de la Santé / Health",
        ] {
            let once = email_safe(input);
            assert_eq!(email_safe(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn id_safe_uses_hyphens_and_drops_dots() {
        assert_eq!(id_safe("Hello World"), "hello-world");
        assert_eq!(id_safe("Hello World.txt"), "hello-worldtxt");
        assert_eq!(id_safe("a  -  b"), "a-b");
    }

    #[test]
    fn email_safe_name_removes_quotes() {
        assert_eq!(email_safe_name("  \"Quoted\" Service "), "Quoted Service");
    }
}
