//! Shared types.

pub mod assignment;
pub mod group;
pub mod object;

pub use assignment::*;
pub use group::*;
pub use object::*;
