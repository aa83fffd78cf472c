//! Timing constraint store for static timing analysis.
//!
//! This crate holds everything the search consults about the design's
//! constraints: clocks and their edges, generated clocks, latencies and
//! insertion delays, uncertainties, input delays, derating factors, data
//! checks, and path exceptions together with their traversal state
//! machines. The store is built programmatically (constraint file parsing
//! is a front-end concern) and is read-only during analysis.

#![warn(missing_docs)]

pub mod clocks;
pub mod derate;
pub mod exceptions;
pub mod io_delays;
pub mod sdc;

pub use clocks::{ClkEdgeRef, Clock, ClockId, ClockUncertainties, GeneratedClock, Waveform};
pub use derate::{DerateType, Derates, PathClkOrData};
pub use exceptions::{
    canonicalize, ExceptionId, ExceptionKind, ExceptionPath, ExceptionPoint, ExceptionState,
    ExceptionStateSet,
};
pub use io_delays::{InputDelay, InputDelayId};
pub use sdc::{DataCheck, Sdc};
