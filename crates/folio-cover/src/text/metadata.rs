// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata extraction — turns a raw PDF `/Info` record into cleaned fields and
// picks a believable author.
//
// Authoring tools stamp documents with account names ("Admin", "Windows User"),
// software names ("Adobe Acrobat") and file paths. Those are rejected so the
// book form is left blank instead of showing a bogus author.

use std::sync::LazyLock;

use folio_core::{DocumentMetadata, SanitizedMetadata};
use regex::{Captures, Regex, RegexSet};
use tracing::{debug, instrument, warn};

use super::sanitize::{TextSanitizer, collapse_whitespace, trim_separators};
use crate::pipeline::MetadataSource;

/// Words that name an account, a machine or a piece of software rather than
/// a person.
const SYSTEM_WORDS: &[&str] = &[
    "user",
    "admin",
    "administrator",
    "owner",
    "default",
    "system",
    "computer",
    "pc",
    "laptop",
    "desktop",
    "windows",
    "microsoft",
    "adobe",
    "acrobat",
    "reader",
    "unknown",
    "anonymous",
    "word",
    "office",
    "distiller",
    "pdfmaker",
    "pdfcreator",
    "pdf",
    "latex",
    "tex",
    "scanner",
];

static SYSTEM_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)^(?:user|admin|administrator|owner|default|system|computer|pc|laptop|desktop|windows|microsoft|adobe|acrobat|reader|unknown|anonymous)$",
        r"^\s*$",
        // Windows and Unix absolute paths
        r"^[a-zA-Z]:\\",
        r"^/[a-zA-Z]",
    ])
    .unwrap()
});

static AUTHOR_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:written|created)\s+by|by|author)\b\s*:?\s*").unwrap()
});
static AUTHOR_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\b(?:author|writer|creator)\s*$").unwrap());
static QUOTES_AND_ANGLES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>"'“”‘’]"#).unwrap());
static LOCAL_PART: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([^@]+)@").unwrap());
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

/// Title patterns that carry an author, tried in order.
static TITLE_AUTHOR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bby\s+([^\-\n\r]+?)(?:\s*[-–—]\s*|\s*$)",
        r"(?i)\bauthor\s*:?\s*([^\-\n\r]+?)(?:\s*[-–—]\s*|\s*$)",
        r"(?i)\bwritten\s+by\s+([^\-\n\r]+?)(?:\s*[-–—]\s*|\s*$)",
        r"(?i)([^\-\n\r]+?)\s*[-–—]\s*author\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Reads document metadata and cleans it for the book form.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Pull metadata from `source` and sanitise it.
    ///
    /// A failing source yields an empty record; the upload carries on with
    /// filename-derived values.
    #[instrument(skip_all)]
    pub fn extract_clean_metadata(source: &dyn MetadataSource) -> SanitizedMetadata {
        match source.metadata() {
            Ok(raw) => Self::sanitize(&raw),
            Err(err) => {
                warn!(error = %err, "Could not read document metadata");
                SanitizedMetadata::default()
            }
        }
    }

    /// Clean every field of a raw record and resolve the author.
    pub fn sanitize(raw: &DocumentMetadata) -> SanitizedMetadata {
        let cleaned = SanitizedMetadata {
            title: clean_body_field(raw.title.as_deref()),
            author: Self::select_author(raw),
            subject: clean_body_field(raw.subject.as_deref()),
            creator: clean_body_field(raw.creator.as_deref()),
            producer: pass_through(raw.producer.as_deref()),
            creation_date: pass_through(raw.creation_date.as_deref()),
            modification_date: pass_through(raw.modification_date.as_deref()),
        };
        debug!(
            has_title = cleaned.title.is_some(),
            has_author = cleaned.author.is_some(),
            "Metadata sanitised"
        );
        cleaned
    }

    /// First acceptable author from the `/Author` field, then `/Creator`, then
    /// the title itself.
    pub fn select_author(raw: &DocumentMetadata) -> Option<String> {
        [raw.author.as_deref(), raw.creator.as_deref()]
            .into_iter()
            .flatten()
            .find_map(accept_author)
            .or_else(|| raw.title.as_deref().and_then(Self::extract_author_from_title))
    }

    /// Find an author embedded in a title such as "Dune by Frank Herbert".
    pub fn extract_author_from_title(title: &str) -> Option<String> {
        TITLE_AUTHOR_PATTERNS.iter().find_map(|pattern| {
            pattern
                .captures(title)
                .and_then(|caps| caps.get(1))
                .and_then(|name| accept_author(name.as_str()))
        })
    }

    /// True for account names, software names, paths and blank values.
    pub fn is_system_generated(value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || SYSTEM_PATTERNS.is_match(value) {
            return true;
        }
        // "Adobe Acrobat", "Windows User": several words, none of them a name.
        let words: Vec<String> = value
            .split_whitespace()
            .map(|word| {
                word.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|word| !word.is_empty())
            .collect();
        words.len() > 1 && words.iter().all(|word| SYSTEM_WORDS.contains(&word.as_str()))
    }

    /// Normalise a person's name: drop "by"/"author" decorations and quotes,
    /// keep only what precedes an "@", then title-case each word.
    pub fn clean_author_name(name: &str) -> String {
        let name = AUTHOR_PREFIX.replace(name.trim(), "");
        let name = trim_separators(&name);
        let name = AUTHOR_SUFFIX.replace(&name, "");
        let name = trim_separators(&name);
        let name = QUOTES_AND_ANGLES.replace_all(&name, "");
        let name = address_local_part(&name).unwrap_or_else(|| name.into_owned());
        let name = WORD.replace_all(&name, |caps: &Captures| title_case_word(&caps[0]));
        collapse_whitespace(&name)
    }
}

/// Run a candidate through cleanup and reject it if nothing personal is left.
fn accept_author(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if MetadataExtractor::is_system_generated(raw) {
        return None;
    }
    let name = MetadataExtractor::clean_author_name(&TextSanitizer::clean_text_content(&raw));
    if name.is_empty() || MetadataExtractor::is_system_generated(&name) {
        None
    } else {
        Some(name)
    }
}

/// Everything before the first "@", with dots and underscores as spaces.
/// `jane.doe@example.com` and `jdoe@localhost` both qualify.
fn address_local_part(value: &str) -> Option<String> {
    LOCAL_PART
        .captures(value.trim())
        .map(|caps| caps[1].replace(['.', '_'], " "))
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn clean_body_field(value: Option<&str>) -> Option<String> {
    value
        .map(TextSanitizer::clean_text_content)
        .filter(|cleaned| !cleaned.is_empty())
}

fn pass_through(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}
