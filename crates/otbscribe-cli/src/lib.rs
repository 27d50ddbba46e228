//! Library surface behind the `otbscribe` binary, split out from `main.rs`
//! so integration tests (and any future sibling binary) can drive
//! `pipeline`/`cli` directly instead of shelling out.

pub mod cli;
pub mod error;
pub mod pipeline;
