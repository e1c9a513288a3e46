//! Text normalisation: undo the damage PDF text layers do to prose.
//!
//! Three passes, in this order:
//!
//! 1. **Line wraps**: a lone `\n` is a layout artefact and becomes a space;
//!    `\n\n` and longer runs are paragraph breaks and stay.
//! 2. **Glued words**: regex pre-split at case and letter/digit boundaries,
//!    then dictionary segmentation of long alphabetic tokens.
//! 3. **Punctuation**: pull stray whitespace out of `. , ; ( ) :` and
//!    collapse repeated spaces.
//!
//! Pass 3 must come after pass 2 because word repair can leave double
//! spaces behind. Normalisation never fails: anything it cannot improve is
//! passed through unchanged.

use crate::segment::WordSegmenter;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Tokens at or below this many letters are never sent to the segmenter.
const MIN_SEGMENT_LEN: usize = 6;

/// Run all three passes over `prose`.
pub fn normalize(prose: &str, segmenter: &dyn WordSegmenter) -> String {
    let s = join_wrapped_lines(prose);
    let s = split_glued_words(&s, segmenter);
    tighten_punctuation(&s)
}

// ── Pass 1: Line wraps ───────────────────────────────────────────────────────

static RE_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").unwrap());

fn join_wrapped_lines(input: &str) -> String {
    RE_NEWLINES
        .replace_all(input, |caps: &Captures<'_>| {
            let run = &caps[0];
            if run.len() == 1 {
                " ".to_string()
            } else {
                run.to_string()
            }
        })
        .into_owned()
}

// ── Pass 2: Glued words ──────────────────────────────────────────────────────

static RE_LOWER_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());

static RE_UPPER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap());

static RE_LETTER_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z])([0-9])").unwrap());

static RE_DIGIT_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9])([A-Za-z])").unwrap());

fn split_glued_words(input: &str, segmenter: &dyn WordSegmenter) -> String {
    let s = RE_LOWER_UPPER.replace_all(input, "${1} ${2}");
    let s = RE_UPPER_RUN.replace_all(&s, "${1} ${2}");
    let s = RE_LETTER_DIGIT.replace_all(&s, "${1} ${2}");
    let s = RE_DIGIT_LETTER.replace_all(&s, "${1} ${2}");

    s.split(' ')
        .map(|token| segment_token(token, segmenter))
        .collect::<Vec<_>>()
        .join(" ")
}

fn segment_token(token: &str, segmenter: &dyn WordSegmenter) -> String {
    let letters = token.chars().count();
    if letters <= MIN_SEGMENT_LEN || !token.chars().all(char::is_alphabetic) {
        return token.to_string();
    }

    let mut parts = segmenter.segment(&token.to_lowercase());
    if parts.len() <= 1 {
        return token.to_string();
    }

    if token.chars().next().is_some_and(char::is_uppercase) {
        parts[0] = capitalize(&parts[0]);
    }
    parts.join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ── Pass 3: Punctuation ──────────────────────────────────────────────────────

static PUNCTUATION_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\s+\.", "."),
        (r"\s+,", ","),
        (r"\s+;", ";"),
        (r"\s+\)", ")"),
        (r"\(\s+", "("),
        (r":\s+", ":"),
        (r" {2,}", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

fn tighten_punctuation(input: &str) -> String {
    PUNCTUATION_RULES
        .iter()
        .fold(input.to_string(), |text, (re, replacement)| {
            re.replace_all(&text, *replacement).into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::UnigramSegmenter;

    /// Splits only the words it was told about.
    struct FixedSegmenter(Vec<(&'static str, Vec<&'static str>)>);

    impl WordSegmenter for FixedSegmenter {
        fn segment(&self, token: &str) -> Vec<String> {
            self.0
                .iter()
                .find(|(word, _)| *word == token)
                .map(|(_, parts)| parts.iter().map(|p| p.to_string()).collect())
                .unwrap_or_else(|| vec![token.to_string()])
        }
    }

    fn no_dictionary() -> FixedSegmenter {
        FixedSegmenter(Vec::new())
    }

    #[test]
    fn single_newline_becomes_space_double_preserved() {
        let out = join_wrapped_lines("line one\nline two\n\nnew paragraph");
        assert_eq!(out, "line one line two\n\nnew paragraph");
    }

    #[test]
    fn glued_case_and_digit_boundaries() {
        let out = normalize("HopeitWorksForYou123", &no_dictionary());
        assert_eq!(out, "Hopeit Works For You 123");
    }

    #[test]
    fn glued_example_with_real_lexicon() {
        // "Hopeit" has exactly six letters, so it is not a segmentation candidate.
        let out = normalize("HopeitWorksForYou123", UnigramSegmenter::english());
        assert_eq!(out, "Hopeit Works For You 123");
    }

    #[test]
    fn uppercase_run_before_word() {
        let out = normalize("HTMLParser", &no_dictionary());
        assert_eq!(out, "HTML Parser");
    }

    #[test]
    fn long_token_segmented_and_recapitalised() {
        let seg = FixedSegmenter(vec![("thequickfox", vec!["the", "quick", "fox"])]);
        let out = normalize("Thequickfox jumps", &seg);
        assert_eq!(out, "The quick fox jumps");
    }

    #[test]
    fn long_token_with_real_lexicon() {
        let out = normalize("Documentsummarization works.", UnigramSegmenter::english());
        assert_eq!(out, "Document summarization works.");
    }

    #[test]
    fn short_and_non_alphabetic_tokens_untouched() {
        let seg = FixedSegmenter(vec![("abcdef", vec!["abc", "def"])]);
        // six letters: not a candidate
        assert_eq!(normalize("abcdef", &seg), "abcdef");
        // punctuation makes the token non-alphabetic
        let seg = FixedSegmenter(vec![("abcdefgh", vec!["abcd", "efgh"])]);
        assert_eq!(normalize("abcdefgh,", &seg), "abcdefgh,");
    }

    #[test]
    fn unresolvable_glue_passes_through() {
        assert_eq!(normalize("zzqxvbnmlk", &no_dictionary()), "zzqxvbnmlk");
    }

    #[test]
    fn punctuation_is_tightened() {
        let out = tighten_punctuation("Hello , world ( see note ) ; done .  Note:  yes");
        assert_eq!(out, "Hello, world (see note); done. Note:yes");
    }

    #[test]
    fn paragraph_breaks_survive_normalisation() {
        let out = normalize("First para\nwraps here.\n\nSecond para.", &no_dictionary());
        assert_eq!(out, "First para wraps here.\n\nSecond para.");
    }
}
