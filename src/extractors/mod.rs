pub mod assembler;
pub mod classifier;
pub mod grammar;
pub mod pipeline;
pub mod profile;
pub mod records;
pub mod resolver;
pub mod section;
pub mod tokenizer;

// Re-export key extraction types for convenience
pub use pipeline::{run_pass, PassOutcome, PassReport};
pub use profile::{DocumentKind, Profile};
pub use records::{OutputRecord, Schema};
pub use tokenizer::TokenMode;
