//! Untis Exams Core Library
//!
//! Logs in to WebUntis, fetches exam schedules, deduplicates them and keeps a
//! calendar in sync with the result.

pub mod alias;
pub mod calendar;
pub mod codec;
pub mod error;
pub mod http;
pub mod reconcile;
pub mod school_year;
pub mod search;
pub mod session;
pub mod store;
pub mod types;

// Re-export core types and error handling
pub use alias::SubjectAliases;
pub use error::{Error, Result};
pub use store::ExamStore;
pub use types::*;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        calendar::*, reconcile::*, school_year::*, search::*, session::*, types::*, ExamStore,
        SubjectAliases,
    };
}
