// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF info reader — opens an uploaded PDF with `lopdf` and reads the trailer
// `/Info` dictionary into a `DocumentMetadata` record.

use std::path::Path;

use folio_core::DocumentMetadata;
use folio_core::error::{FolioError, Result};
use lopdf::{Dictionary, Document, Object};
use tracing::{debug, info, instrument};

use crate::pipeline::MetadataSource;

/// Read-only view of an uploaded PDF.
pub struct PdfInfoReader {
    document: Document,
    /// Where the upload was read from; `None` for in-memory uploads.
    source_path: Option<String>,
}

impl PdfInfoReader {
    /// Parse an uploaded PDF stored on disk.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!(path = %path_ref.display(), "Reading uploaded PDF");

        let document = Document::load(path_ref).map_err(|err| {
            FolioError::PdfError(format!("{} is not a readable PDF: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "Upload parsed from disk");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Parse an upload that arrived as a byte buffer.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            FolioError::PdfError(format!("upload buffer is not a readable PDF: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "Upload parsed from memory");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    /// Pages in the upload, as counted by the page tree.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Upload path, for log lines and error reports.
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Read the `/Info` dictionary. A document without one yields an empty
    /// record; an `/Info` entry that is not a dictionary is an error.
    pub fn info(&self) -> Result<DocumentMetadata> {
        let Ok(entry) = self.document.trailer.get(b"Info") else {
            debug!("Trailer has no /Info entry");
            return Ok(DocumentMetadata::default());
        };
        let dict = self
            .resolve(entry)
            .and_then(|obj| obj.as_dict().ok())
            .ok_or_else(|| FolioError::Metadata("/Info is not a dictionary".into()))?;

        Ok(DocumentMetadata {
            title: self.text_entry(dict, b"Title"),
            author: self.text_entry(dict, b"Author"),
            subject: self.text_entry(dict, b"Subject"),
            creator: self.text_entry(dict, b"Creator"),
            producer: self.text_entry(dict, b"Producer"),
            creation_date: self.text_entry(dict, b"CreationDate"),
            modification_date: self.text_entry(dict, b"ModDate"),
        })
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.document.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn text_entry(&self, dict: &Dictionary, key: &[u8]) -> Option<String> {
        let obj = self.resolve(dict.get(key).ok()?)?;
        let text = match obj {
            Object::String(bytes, _) => decode_text_string(bytes),
            Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
            _ => return None,
        };
        let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        (!text.is_empty()).then(|| text.to_string())
    }
}

impl MetadataSource for PdfInfoReader {
    fn metadata(&self) -> Result<DocumentMetadata> {
        self.info()
    }
}

/// Decode a PDF text string: UTF-16BE with a `FE FF` byte-order mark, UTF-8
/// with `EF BB BF`, otherwise UTF-8 when valid and Latin-1 when not.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
