//! Age-based cleaning, guarded deletion and the ignore registry.

pub mod cleaner;
pub mod ignore;

pub use cleaner::{CleanStats, Cleaner};
pub use ignore::IgnoreRegistry;
