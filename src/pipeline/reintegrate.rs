//! Reintegration: clean the summary and append the preserved units.
//!
//! ## Rule Order
//!
//! Sanitising runs before the sections are appended, so code and equations
//! are emitted byte-for-byte as extracted. Compatibility decomposition
//! (NFKD) runs before the character filter so ligatures such as `ﬁ` become
//! plain letters instead of being dropped.

use crate::output::ExtractedUnit;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Heading text of the preserved-code section.
pub const CODE_HEADING: &str = "Code Blocks";
/// Heading text of the preserved-equation section.
pub const EQUATION_HEADING: &str = "Equations";

const CODE_HEADER: &str = "\n\n# Code Blocks\n";
const EQUATION_HEADER: &str = "\n\n# Equations\n";

/// Build the final document text.
///
/// Sections appear only when their collection is non-empty, code first,
/// each unit on its own line in extraction order.
pub fn reintegrate(
    summary: &str,
    code_units: &[ExtractedUnit],
    equation_units: &[ExtractedUnit],
) -> String {
    let mut out = sanitize(summary);
    append_section(&mut out, CODE_HEADER, code_units);
    append_section(&mut out, EQUATION_HEADER, equation_units);
    out
}

/// NFKD-normalise and drop characters that are not printable.
///
/// Printable means outside the Unicode "Other" (`C*`) and "Separator"
/// (`Z*`) categories, with ASCII space, `\n` and `\t` kept. Compatibility
/// spaces such as U+00A0 decompose to ASCII space first and survive.
pub fn sanitize(text: &str) -> String {
    let decomposed: String = text.nfkd().collect();
    RE_NON_PRINTABLE.replace_all(&decomposed, "").into_owned()
}

/// Cc, Cf, Co, Cn, Zs, Zl and Zp, minus the three kept characters.
/// Surrogates (Cs) cannot occur in a `str`.
static RE_NON_PRINTABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{Cc}\p{Cf}\p{Co}\p{Cn}\p{Zs}\p{Zl}\p{Zp}&&[^ \n\t]]").unwrap()
});

fn append_section(out: &mut String, header: &str, units: &[ExtractedUnit]) {
    if units.is_empty() {
        return;
    }
    out.push_str(header);
    let body = units
        .iter()
        .map(|u| u.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str(&body);
}
