// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text sanitizer — strips watermark vocabulary, URLs and site branding from
// titles, authors and filenames.
//
// Cleanup is driven by ordered tables of (pattern, replacement) rules. Every
// rule runs on every input; rules never short-circuit each other. Bracketed
// annotations and URLs are matched before single words so that a whole
// "[Watermarked copy]" or "www.sample-books.com" goes in one piece.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// One cleanup rule: every match of `pattern` becomes `replacement`.
pub struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn apply(&self, text: &str) -> String {
        self.pattern.replace_all(text, self.replacement).into_owned()
    }
}

fn build_rules(table: &[(&str, &'static str)]) -> Vec<Rule> {
    table
        .iter()
        .map(|(pattern, replacement)| Rule {
            pattern: Regex::new(pattern).unwrap(),
            replacement,
        })
        .collect()
}

// -- Body text rules -----------------------------------------------------------

/// Rules for titles, subjects and other free text. Matches become a space.
static BODY_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    build_rules(&[
        // Bracketed annotations mentioning a watermark
        (r"(?i)\[[^\]]*watermark[^\]]*\]", " "),
        (r"(?i)\([^)]*watermark[^)]*\)", " "),
        (r"(?i)\{[^}]*watermark[^}]*\}", " "),
        // Dash-delimited watermark suffixes/prefixes
        (r"(?i)[-–—]\s*watermark(?:ed)?\b", " "),
        (r"(?i)\bwatermark(?:ed)?\s*[-–—]", " "),
        // URLs and bare domains
        (r"(?i)\bhttps?://[^\s]+", " "),
        (r"(?i)\bwww\.[a-z0-9.\-]+\.[a-z]{2,}[^\s]*", " "),
        // Lower-case TLD only, so "ASP.NET" survives
        (r"\b(?i:[a-z0-9][a-z0-9.\-]*)\.(?:com|org|net|edu|io)\b", " "),
        // Boilerplate phrases
        (r"(?i)\bthis is a sample\b", " "),
        (r"(?i)\bfor preview only\b", " "),
        (r"(?i)\bnot for distribution\b", " "),
        (r"(?i)\binternal use(?: only)?\b", " "),
        (r"(?i)\bproperty of\b", " "),
        (r"(?i)\b(?:confidential|draft)\b", " "),
        // Generic watermark vocabulary
        (
            r"(?i)\b(?:watermark(?:ed)?|sample|preview|demo|trial|evaluation|copyright)\b",
            " ",
        ),
        (r"[©®™]", " "),
        // File-sharing and publisher branding
        (
            r"(?i)\b(?:scribd|slideshare|academia\.edu|researchgate|pdfdrive|libgen|z-library|zlibrary)\b",
            " ",
        ),
        (r"(?i)\b(?:springer|elsevier|wiley|pearson|mcgraw[\s\-]?hill)\b", " "),
    ])
});

// -- Filename rules ------------------------------------------------------------

/// Rules for uploaded file names. Watermark matches are removed outright.
static FILENAME_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    build_rules(&[
        // Separator-joined watermark words: "_watermark", "-sample", " preview".
        // The trailing separator is consumed too, hence the space; stacked
        // words like "_sample_preview" are caught on the next pass.
        (
            r"(?i)[_\-\s](?:watermark(?:ed)?|sample|preview|demo|trial)(?:[_\-\s]|$)",
            " ",
        ),
        // Bracketed annotations mentioning a watermark
        (r"(?i)\[[^\]]*?watermark[^\]]*?\]", ""),
        (r"(?i)\([^)]*?watermark[^)]*?\)", ""),
        (r"(?i)\{[^}]*?watermark[^}]*?\}", ""),
        // Trailing website references
        (r"(?i)\s*-\s*www\.[a-z0-9.\-]+", ""),
        (r"(?i)\s*-\s*[a-z0-9.\-]+\.(?:com|org|net)\b", ""),
        // Version indicators
        (r"(?i)(?:^|[\s_\-])v\d+(?:\.\d+)*(?:[\s_\-]|$)", " "),
        (r"(?i)(?:^|[\s_\-])version[\s_\-]*\d+(?:\.\d+)*(?:[\s_\-]|$)", " "),
        // Doubled dashes left behind by the removals above
        (r"\s*-\s*-\s*", " "),
    ])
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static EMPTY_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\)|\[\s*\]|\{\s*\}").unwrap());
static EDGE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s\-–—|:,;/]+|[\s\-–—|:,;/]+$").unwrap());
static WORD_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w").unwrap());

/// Regex-table cleanup for free text and filenames.
pub struct TextSanitizer;

impl TextSanitizer {
    /// Remove watermark vocabulary, URLs and branding from free text.
    ///
    /// Whitespace is collapsed and dangling separators at either end are
    /// dropped, so "Deep Learning - www.pdfdrive.com" becomes "Deep Learning".
    pub fn clean_text_content(text: &str) -> String {
        let cleaned = BODY_RULES
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc));
        let cleaned = EMPTY_BRACKETS.replace_all(&cleaned, " ");
        trim_separators(&collapse_whitespace(&cleaned))
    }

    /// Turn an uploaded file name into a presentable title.
    ///
    /// A trailing ".pdf" (any case) is stripped first. Watermark suffixes,
    /// bracketed annotations, site references and version tags are removed,
    /// dashes and underscores become spaces, and each word gets an upper-case
    /// first letter.
    pub fn clean_filename(filename: &str) -> String {
        let stem = strip_pdf_extension(filename);
        let cleaned = apply_until_stable(&FILENAME_RULES, stem);
        let cleaned = cleaned.replace(['-', '_'], " ");
        let cleaned = collapse_whitespace(&cleaned);
        capitalize_word_starts(&cleaned)
    }
}

/// Run the whole table repeatedly until a pass leaves the text unchanged.
///
/// Every filename rule replaces a match with something shorter, so the text
/// shrinks on each changing pass and the loop ends.
fn apply_until_stable(rules: &[Rule], text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = rules.iter().fold(current.clone(), |acc, rule| rule.apply(&acc));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Collapse runs of whitespace to one space and trim both ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Drop dashes, pipes, colons and similar separators dangling at either end.
pub(crate) fn trim_separators(text: &str) -> String {
    EDGE_SEPARATORS.replace_all(text, "").into_owned()
}

fn strip_pdf_extension(filename: &str) -> &str {
    let trimmed = filename.trim();
    match trimmed.len().checked_sub(4) {
        Some(cut)
            if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".pdf") =>
        {
            &trimmed[..cut]
        }
        _ => trimmed,
    }
}

/// Upper-case the first character of every word, leaving the rest alone.
fn capitalize_word_starts(text: &str) -> String {
    WORD_START
        .replace_all(text, |caps: &Captures| caps[0].to_uppercase())
        .into_owned()
}
