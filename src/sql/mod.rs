//! SQL builder for filtered list queries; values are always bound as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
