//! DYNQ Frame - Schema-on-read materialization of store items
//!
//! Turns a batch of heterogeneous, schemaless items into a rectangular
//! frame of strictly-typed nullable columns. Column types are inferred from
//! the first non-null value and adapted as later rows disagree:
//!
//! - int64 columns widen to float64 when a decimal arrives
//! - any other disagreement rebuilds the column as string
//! - composite values that cannot be rendered store a placeholder tag

mod assembler;
mod attribute;
mod decoder;

pub use assembler::{FrameBuilder, build_frame};
pub use attribute::Attribute;
pub use decoder::{Number, decode, parse_number};

#[cfg(test)]
mod assembler_tests;
#[cfg(test)]
mod attribute_tests;
#[cfg(test)]
mod decoder_tests;
