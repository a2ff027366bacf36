// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text cleanup for titles, filenames and document metadata.

pub mod metadata;
pub mod sanitize;

pub use metadata::MetadataExtractor;
pub use sanitize::TextSanitizer;
