/*!
A low-level library for reading PDF files.

This crate covers the syntax layer of the PDF specification: lexing raw bytes
into tokens, building typed objects from them, decoding stream filters,
locating and merging cross-reference sections, and flattening the page tree.
Everything above that (color spaces, fonts, rendering) is out of scope and
lives in the sibling crates.

The object model is materialized: parsing an object yields an immutable value
tree, and anything that points to another indirect object stores its
`(number, generation)` key. Resolution goes through [`XRef`], which memoizes
materialized objects, so shared identity is preserved without constructing
owned reference cycles.

# Example

```no_run
use carta_syntax::Document;

let data = std::fs::read("file.pdf").unwrap();
let doc = Document::load(data).unwrap();

for page in doc.pages() {
    println!("{} x {}", page.width(), page.height());
}
```
*/

#![deny(missing_docs)]

pub(crate) mod cursor;
pub(crate) mod lexer;
pub(crate) mod parser;
pub(crate) mod trivia;

pub mod content;
pub mod document;
pub mod error;
pub mod filter;
pub mod object;
pub mod page;
pub mod xref;

#[doc(hidden)]
pub mod test_pdf;

pub use document::{Document, Metadata};
pub use error::{FilterError, LoadError};
pub use object::{DateTime, Dict, Name, ObjRef, Object, PdfString, Rect, Stream};
pub use page::{Page, Rotation};
pub use xref::XRef;
