//! Clock tree frequency resolver
//!
//! A clock tree is described as a [`ClockGraph`]: a set of clock sources
//! (oscillators, PLLs, muxes and bus prescalers), each with a list of
//! *candidate* parents. Every source transforms the frequency of its
//! selected parent with a [`Prescaler`] and must end up inside its
//! [`FrequencyLimits`].
//!
//! [`resolve`] searches every parent selection (a *combination*), and
//! for each one propagates the root frequencies down the tree to find
//! which prescaler factors can possibly satisfy all constraints. Where
//! several factors remain, the frequency of the next node in the
//! graph's priority order is fixed to its highest (or lowest) reachable
//! value and propagation is repeated, until the whole tree is
//! determined. The best combination, compared node by node in priority
//! order, is returned as a [`ResolvedClockTree`].
//!
//! ```rust
//! use stm32f1xx_clocks::clock_tree::*;
//!
//! const OSC: ClockId = ClockId(0);
//! const PLL: ClockId = ClockId(1);
//! const BUS: ClockId = ClockId(2);
//!
//! let graph = ClockGraph::builder()
//!     .clock(
//!         ClockSourceDescriptor::new(OSC, "osc", Prescaler::multiply(&[1]))
//!             .limits(FrequencyLimits::exact(8_000_000)),
//!         &[],
//!     )
//!     .clock(
//!         ClockSourceDescriptor::new(PLL, "pll", Prescaler::multiply(&[2, 3, 4, 5, 6, 7, 8, 9]))
//!             .limits(FrequencyLimits::range(1_000_000, 72_000_000)),
//!         &[OSC],
//!     )
//!     .clock(
//!         ClockSourceDescriptor::new(BUS, "bus", Prescaler::divide(&[1, 2, 4, 8]))
//!             .limits(FrequencyLimits::range(600_000, 14_000_000))
//!             .leaf(Activation::Always),
//!         &[PLL],
//!     )
//!     .build()
//!     .unwrap();
//!
//! let tree = resolve(&graph, &Requirements::new(), Direction::PreferHighest).unwrap();
//! assert!(tree.is_valid());
//! assert_eq!(tree.config_for(BUS).frequency.0, 9_000_000);
//! ```

use static_assertions::const_assert;

mod descriptor;
mod error;
mod graph;
mod limits;
mod prescaler;
mod requirements;
mod resolved;
mod resolver;
mod state;

pub use descriptor::{Activation, ClockSourceDescriptor, CompatibilityFn};
pub use error::Error;
pub use graph::{ClockGraph, ClockGraphBuilder};
pub use limits::FrequencyLimits;
pub use prescaler::{Prescaler, PrescalerKind};
pub use requirements::Requirements;
pub use resolved::{ClockConfig, ResolvedClockTree};
pub use resolver::resolve;

/// Maximum number of clock sources in one graph
pub const MAX_CLOCKS: usize = 32;
/// Maximum number of candidate parents of one clock source
pub const MAX_PARENTS: usize = 10;
/// Maximum number of candidate children of one clock source
pub const MAX_CHILDREN: usize = 10;
/// Maximum number of factors of one prescaler
pub const MAX_FACTORS: usize = 20;

// Node sets and factor sets are kept as u32 bitmaps
const_assert!(MAX_CLOCKS <= 32);
const_assert!(MAX_FACTORS <= 32);
// Parent selections are stored as u8
const_assert!(MAX_PARENTS <= u8::MAX as usize);

/// Stable identifier of a clock source within a graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockId(pub u8);

/// Global optimisation goal when several configurations are feasible
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Prefer the highest frequencies, in priority order
    PreferHighest,
    /// Prefer the lowest frequencies, in priority order
    PreferLowest,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::PreferHighest
    }
}

impl Direction {
    /// Pick the preferred end of the range `lo..=hi`
    pub fn pick(self, lo: u32, hi: u32) -> u32 {
        match self {
            Direction::PreferHighest => hi,
            Direction::PreferLowest => lo,
        }
    }

    /// Returns true if `candidate` is strictly preferred over `current`
    pub fn prefers(self, candidate: u32, current: u32) -> bool {
        match self {
            Direction::PreferHighest => candidate > current,
            Direction::PreferLowest => candidate < current,
        }
    }
}

/// Iterate over the indices of the set bits of `bits`, lowest first
pub(crate) fn bits(mut bits: u32) -> impl Iterator<Item = usize> {
    core::iter::from_fn(move || {
        if bits == 0 {
            None
        } else {
            let index = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            Some(index)
        }
    })
}
