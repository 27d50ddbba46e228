//! UCI engine subprocess client and per-ply annotation (spec §4.E).
//!
//! [`client`] owns the subprocess plumbing (spawn, handshake, per-query
//! timeout); [`annotate`] turns a sequence of queries into classified
//! [`otbscribe_models::MoveRecord`]s and selects key plies.

pub mod annotate;
pub mod client;
pub mod error;

pub use annotate::{classify, select_key_plies, Annotator};
pub use client::{resolve_engine_path, UciClient, UciInfo};
pub use error::{EngineError, EngineResult};
