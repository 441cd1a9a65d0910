//! Adapter implementations

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::*;

#[cfg(feature = "postgres")]
pub use postgres::*;
