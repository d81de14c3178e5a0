//! Chunked JSON transport carried over the game log.
//!
//! The game cannot write files of its own, so it prints each JSON document
//! as a START line, any number of CHUNK lines, and an END line, all sharing
//! one message UUID. [`MarkerParser`] recognises those lines and
//! [`ChunkAssembler`] stitches the fragments back together.

mod assembler;
mod marker;

pub use assembler::{ChunkAssembler, LineOutcome};
pub use marker::{MarkerLine, MarkerParser};
