#![forbid(unsafe_code)]

pub mod adapters;
pub mod error;
pub mod model;
pub mod time;

pub use error::CaseError;
pub use time::Clock;
