//! Position Source Adapters
//!
//! - [`SyntheticPositionSource`]: seeded generator, the fallback for any
//!   unavailable exchange
//! - [`InMemoryPositionSource`]: settable positions and failures
//! - [`JsonFilePositionSource`]: one JSON file per exchange, re-read every tick

mod in_memory;
mod json_file;
mod synthetic;

pub use in_memory::InMemoryPositionSource;
pub use json_file::JsonFilePositionSource;
pub use synthetic::SyntheticPositionSource;
