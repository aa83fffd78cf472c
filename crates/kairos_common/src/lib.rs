//! Shared foundational types used across the kairos timing engine.
//!
//! This crate provides the delay value type with fuzzy comparison, the
//! min/max analysis direction, rise/fall transitions, interned identifiers,
//! and common result types.

#![warn(missing_docs)]

pub mod delay;
pub mod ident;
pub mod minmax;
pub mod result;
pub mod transition;

pub use delay::Delay;
pub use ident::{Ident, Interner};
pub use minmax::MinMax;
pub use result::{InternalError, StaResult};
pub use transition::RiseFall;
