//! # Song Markup: Chord Sheet Renderer for Web Pages and E-books
//!
//! This crate turns parsed songs from `songbook_core` into finished documents. Two output
//! variants are supported, both built from the same block assembler and chord grouping logic:
//!
//! - **Web** ([`WebConverter`]): a standalone HTML page with SEO metadata (description,
//!   Open Graph, optional canonical link) and schema.org `MusicComposition` structured data.
//! - **E-book** ([`EpubConverter`]): a namespaced XHTML content document suitable for EPUB
//!   packaging, where significant spaces next to chord spans are made explicit.
//!
//! Externally authored head/prefix/suffix fragments are parsed once into [`SongTemplates`]
//! and deep-copied for every song before placeholder substitution, so one template set can
//! be shared by a whole (possibly parallel) batch.
//!
//! ## Example
//!
//! ```rust
//! use song_markup::{RenderContext, SongConverter, SongTemplates, WebConverter};
//! use songbook_core::{Block, Chunk, RenderOptions, Row, SongBuilder, Substitutions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let song = SongBuilder::default()
//!         .title("Hej, sokoły")
//!         .block(Block::verse(vec![Row::over(vec![
//!             Chunk::new("a", "Hej, tam "),
//!             Chunk::new("E", "gdzieś"),
//!         ])]))
//!         .build()?;
//!
//!     let templates = SongTemplates::from_markup("", "", "<footer>{{BASE_FILENAME}}</footer>")?;
//!     let substitutions = Substitutions::new();
//!     let context = RenderContext::new(&templates, &substitutions, "hej_sokoly");
//!
//!     let html = WebConverter::new(RenderOptions::default()).render(&song, &context)?;
//!     assert!(html.contains("<footer>hej_sokoly</footer>"));
//!     assert!(html.contains(r#"<span class="ch-stack" aria-hidden="true">"#));
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod fragment;
pub mod generator;
pub mod language;
pub mod serializer;
pub mod tree;

pub use batch::{BatchOptions, SongEntry, load_song_json, render_batch};
pub use fragment::{SongTemplates, inject_fragments, parse_fragments};
pub use generator::{
    EpubConverter, RenderContext, SongConverter, WebConverter, converter_for, write_atomically,
};
pub use language::{ResolvedLanguage, resolve_language};
