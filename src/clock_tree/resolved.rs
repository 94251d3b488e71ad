//! Result of a resolution

use heapless::Vec;

use super::resolver::Attempt;
use super::{ClockGraph, ClockId, PrescalerKind, MAX_CLOCKS};
use crate::time::Hertz;

/// Final configuration of one clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockConfig {
    /// Resulting frequency, zero if unused
    pub frequency: Hertz,
    /// Kind of the prescaler
    pub prescaler_kind: PrescalerKind,
    /// Selected factor
    pub prescaler_value: u32,
    /// Common divisor of the prescaler
    pub prescaler_divisor: u32,
    /// The clock feeds an active leaf
    pub used: bool,
}

impl ClockConfig {
    /// Configuration reported for clocks that are unused, unknown, or
    /// part of an invalid tree
    pub const UNUSED: ClockConfig = ClockConfig {
        frequency: Hertz(0),
        prescaler_kind: PrescalerKind::Divide,
        prescaler_value: 1,
        prescaler_divisor: 1,
        used: false,
    };
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::UNUSED
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    id: ClockId,
    config: ClockConfig,
    parent: Option<ClockId>,
}

/// Frozen clock configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedClockTree {
    valid: bool,
    entries: Vec<Entry, MAX_CLOCKS>,
}

impl ResolvedClockTree {
    pub(crate) fn new(graph: &ClockGraph, attempt: Option<&Attempt>) -> Self {
        let attempt = match attempt {
            Some(attempt) => attempt,
            None => {
                return ResolvedClockTree {
                    valid: false,
                    entries: Vec::new(),
                }
            }
        };

        let mut entries = Vec::new();
        for index in 0..graph.len() {
            let node = graph.node(index);
            let descriptor = &node.descriptor;
            let used = attempt.used & (1 << index) != 0;

            let entry = if used {
                let prescaler = &descriptor.prescaler;
                let factor_index = usize::from(attempt.factors[index]);
                Entry {
                    id: descriptor.id,
                    config: ClockConfig {
                        frequency: Hertz(attempt.frequencies[index]),
                        prescaler_kind: prescaler.kind(),
                        prescaler_value: prescaler.factor(factor_index),
                        prescaler_divisor: prescaler.divisor(),
                        used: true,
                    },
                    parent: node
                        .parents
                        .get(usize::from(attempt.selection[index]))
                        .map(|&p| graph.id(usize::from(p))),
                }
            } else {
                Entry {
                    id: descriptor.id,
                    config: ClockConfig::UNUSED,
                    parent: None,
                }
            };
            // Cannot overflow: the graph has at most MAX_CLOCKS clocks
            entries.push(entry).ok();
        }

        ResolvedClockTree {
            valid: true,
            entries,
        }
    }

    fn entry(&self, id: ClockId) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Returns false if no configuration satisfies all constraints
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Configuration of `id`
    pub fn config_for(&self, id: ClockId) -> ClockConfig {
        self.entry(id).map_or(ClockConfig::UNUSED, |entry| entry.config)
    }

    /// Selected parent of `id`, or `default` if the clock is unused or a
    /// root
    pub fn parent_of(&self, id: ClockId, default: ClockId) -> ClockId {
        self.entry(id).and_then(|entry| entry.parent).unwrap_or(default)
    }

    /// Frequency of `id`, if it is used
    pub fn frequency(&self, id: ClockId) -> Option<Hertz> {
        let config = self.config_for(id);
        if config.used {
            Some(config.frequency)
        } else {
            None
        }
    }

    /// Returns true if `id` feeds an active leaf
    pub fn is_used(&self, id: ClockId) -> bool {
        self.config_for(id).used
    }

    /// All clocks with their configuration, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (ClockId, ClockConfig)> + '_ {
        self.entries.iter().map(|entry| (entry.id, entry.config))
    }
}
