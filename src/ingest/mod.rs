//! Document ingestion: parse uploaded files and split them into chunks.

mod chunker;
mod llama_parse;
mod parser;

pub use chunker::{Chunker, TextChunk};
pub use llama_parse::LlamaParseClient;
pub use parser::{DocumentParser, ParsedDocument, PlainTextParser, RoutingParser};
