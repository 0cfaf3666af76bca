pub mod extractor;

pub use extractor::extractor_for;
