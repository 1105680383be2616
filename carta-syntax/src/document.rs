//! The document model: trailer, catalog, pages and metadata.

use crate::error::LoadError;
use crate::lexer::{Lexer, TokenKind};
use crate::object::name::keys::*;
use crate::object::{DateTime, Name};
use crate::page::{flatten_pages, Page};
use crate::xref::XRef;
use std::sync::Arc;

/// The window at the start of the file searched for the `%PDF-` header.
const HEADER_WINDOW: usize = 1024;

/// An open PDF document.
#[derive(Debug)]
pub struct Document {
    xref: XRef,
    pages: Vec<Page>,
    version: f32,
}

impl Document {
    /// Read a document from the raw bytes of a PDF file.
    pub fn load(data: impl Into<Vec<u8>>) -> Result<Document, LoadError> {
        let data: Arc<[u8]> = data.into().into();

        if data.is_empty() {
            return Err(LoadError::InvalidArgument("empty input".into()));
        }

        let header_version = find_header_version(&data);
        if header_version.is_none() {
            // Not fatal: files with a trailing conforming xref are accepted
            // even when the header is damaged.
            log::warn!("no %PDF- header found within the first {HEADER_WINDOW} bytes");
        }

        let xref = XRef::load(data)?;

        let catalog = xref.catalog().ok_or(LoadError::MalformedPdf)?;
        let pages = flatten_pages(&catalog, &xref);

        // The catalog may override the header version.
        let version = catalog
            .get::<Name>(VERSION, &xref)
            .and_then(|n| n.as_str().parse::<f32>().ok())
            .or(header_version)
            .unwrap_or(1.0);

        Ok(Document {
            xref,
            pages,
            version,
        })
    }

    /// The flattened, ordered page list.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// The document's xref table and object cache.
    pub fn xref(&self) -> &XRef {
        &self.xref
    }

    /// The PDF version, e.g. `1.7`.
    pub fn version(&self) -> f32 {
        self.version
    }

    /// The document metadata from the `/Info` dictionary.
    pub fn metadata(&self) -> Metadata {
        let Some(info) = self.xref.info() else {
            return Metadata::default();
        };
        let xref = &self.xref;

        let text = |key: &str| -> Option<String> {
            Some(info.get::<crate::object::PdfString>(key, xref)?.to_text())
        };

        Metadata {
            title: text(TITLE),
            author: text(AUTHOR),
            subject: text(SUBJECT),
            keywords: text(KEYWORDS),
            creator: text(CREATOR),
            producer: text(PRODUCER),
            creation_date: info.get::<DateTime>(CREATION_DATE, xref),
            modification_date: info.get::<DateTime>(MOD_DATE, xref),
        }
    }
}

/// Document metadata from the `/Info` dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// The document title.
    pub title: Option<String>,
    /// The document author.
    pub author: Option<String>,
    /// The document subject.
    pub subject: Option<String>,
    /// The document keywords.
    pub keywords: Option<String>,
    /// The program that created the original document.
    pub creator: Option<String>,
    /// The program that produced the PDF.
    pub producer: Option<String>,
    /// When the document was created.
    pub creation_date: Option<DateTime>,
    /// When the document was last modified.
    pub modification_date: Option<DateTime>,
}

/// The version from the `%PDF-` header, which may sit anywhere within the
/// first kilobyte.
fn find_header_version(data: &[u8]) -> Option<f32> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let at = window.windows(5).position(|w| w == b"%PDF-")?;

    let mut lexer = Lexer::at(data, at + 5);
    match lexer.try_token()?.kind {
        TokenKind::Real(v) => Some(v),
        TokenKind::Integer(i) => Some(i as f32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::PdfBuilder;

    fn minimal() -> PdfBuilder {
        PdfBuilder::new()
            .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
            .object(3, b"<< /Type /Page /MediaBox [0 0 100 200] >>")
    }

    #[test]
    fn header_version() {
        let doc = Document::load(minimal().build()).unwrap();
        assert_eq!(doc.version(), 1.7);
    }

    #[test]
    fn header_after_garbage() {
        let doc = Document::load(minimal().leading_garbage(b"junk bytes\n").build()).unwrap();
        assert_eq!(doc.version(), 1.7);
        assert_eq!(doc.pages().len(), 1);
    }

    #[test]
    fn metadata_accessors() {
        let data = minimal()
            .object(
                4,
                b"<< /Title (My Doc) /Author (A. Writer) /CreationDate (D:20230701120000Z) >>",
            )
            .trailer_extra(b"/Info 4 0 R ")
            .build();

        let doc = Document::load(data).unwrap();
        let meta = doc.metadata();
        assert_eq!(meta.title.as_deref(), Some("My Doc"));
        assert_eq!(meta.author.as_deref(), Some("A. Writer"));
        assert_eq!(meta.creation_date.unwrap().year, 2023);
        assert_eq!(meta.producer, None);
    }

    #[test]
    fn empty_input_is_invalid_argument() {
        assert!(matches!(
            Document::load(Vec::new()),
            Err(LoadError::InvalidArgument(_))
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = Document::load(b"not a pdf at all".to_vec()).unwrap_err();
        assert_eq!(err, LoadError::MalformedPdf);
    }
}
