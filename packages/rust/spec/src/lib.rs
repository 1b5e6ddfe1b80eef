//! Specification loading and indexing.
//!
//! Turns an OpenAPI 3.x or Swagger 2.0 document (JSON or YAML, local file or
//! `http(s)` URL) into a [`SpecIndex`]: a flat, fully dereferenced view that
//! downstream hashing and writing never need to resolve references against.

mod index;
mod resolve;
mod source;

use tracing::instrument;

use specdocs_shared::Result;

pub use index::{
    DEFAULT_TAG, Endpoint, SecurityScheme, SpecIndex, SpecInfo, SpecVersion, TagInfo,
    build_index,
};
pub use source::{SpecFormat, SpecSource, parse_document, read_source};

/// Load a spec from a path or URL and build its index.
#[instrument]
pub async fn load_spec(location: &str) -> Result<SpecIndex> {
    let source = read_source(location).await?;
    index_from_str(&source.text, source.format)
}

/// Build an index from in-memory document text.
pub fn index_from_str(text: &str, format: SpecFormat) -> Result<SpecIndex> {
    let doc = parse_document(text, format)?;
    build_index(&doc)
}
