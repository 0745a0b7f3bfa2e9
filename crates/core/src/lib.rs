// crates/core/src/lib.rs
pub mod discovery;
pub mod error;
pub mod journal;
pub mod lines;
pub mod loader;
pub mod parser;
pub mod paths;
pub mod preview;
pub mod relocate;
pub mod repository;
pub mod session_index;
pub mod types;

pub use error::*;
pub use loader::{IndexSource, ScanSource, SessionSource};
pub use parser::*;
pub use paths::*;
pub use preview::*;
pub use repository::*;
pub use session_index::{SessionIndex, INDEX_FILE_NAME};
pub use types::*;
