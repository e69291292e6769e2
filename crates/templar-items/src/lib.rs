#![warn(missing_docs)]

//! Serialized item records for templar
//!
//! Turns the raw text of serialized content items into immutable [`Item`]
//! records: a [`Lexer`] produces positioned tokens, the grammar in
//! [`parser`] assembles records from them, and [`ItemParser`] types those
//! records, enforcing mandatory keys and the versioned-field allow-list.

pub mod error;
pub mod interner;
pub mod lexer;
pub mod models;
pub mod parser;

pub use error::{ItemsError, Result};
pub use interner::Interner;
pub use lexer::{Lexer, Token, TokenKind, TokenStream};
pub use models::{
    bracketed, set_id_from_name, Field, Item, ItemFile, ItemId, ItemSet, ItemSetId,
    LanguageVersion,
};
pub use parser::{ItemParser, ParserConfig};
