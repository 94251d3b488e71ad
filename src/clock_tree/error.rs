//! Configuration errors

use core::fmt;

use super::ClockId;

/// Mistakes in the graph description or the frequency requirements.
///
/// These are detected before the search starts. A configuration that is
/// well formed but cannot be satisfied is not an error: it resolves to a
/// tree whose `is_valid()` is false.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The same bound was declared twice for one clock
    DuplicateRequirement(ClockId),
    /// An exact frequency was combined with a minimum or maximum
    ExactWithRange(ClockId),
    /// The minimum frequency is above the maximum
    InvertedRange(ClockId),
    /// An exact frequency lies outside the hardware limits of the clock
    OutOfBounds(ClockId),
    /// The clock is not part of the graph
    UnknownClock(ClockId),
    /// Two clocks were declared with the same id
    DuplicateClock(ClockId),
    /// A parent was not declared before this clock
    NotTopological(ClockId),
    /// A fixed capacity of the graph or of a prescaler was exceeded
    CapacityExceeded,
    /// A prescaler has no factors, a zero factor or divisor, or a
    /// repeated factor
    InvalidPrescaler,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::DuplicateRequirement(id) => {
                write!(f, "clock {}: requirement declared twice", id.0)
            }
            Error::ExactWithRange(id) => write!(
                f,
                "clock {}: exact frequency combined with min/max",
                id.0
            ),
            Error::InvertedRange(id) => {
                write!(f, "clock {}: min frequency above max", id.0)
            }
            Error::OutOfBounds(id) => write!(
                f,
                "clock {}: exact frequency outside hardware limits",
                id.0
            ),
            Error::UnknownClock(id) => write!(f, "clock {}: not in graph", id.0),
            Error::DuplicateClock(id) => {
                write!(f, "clock {}: declared twice", id.0)
            }
            Error::NotTopological(id) => write!(
                f,
                "clock {}: parent missing or declared after child",
                id.0
            ),
            Error::CapacityExceeded => f.write_str("clock graph capacity exceeded"),
            Error::InvalidPrescaler => f.write_str("invalid prescaler factors"),
        }
    }
}
