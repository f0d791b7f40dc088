//! Block value type and material predicates.
#![forbid(unsafe_code)]

pub mod types;

pub use types::{Block, BlockType};
