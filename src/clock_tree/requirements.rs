//! Frequency requirements supplied by the application

use heapless::Vec;

use super::{ClockGraph, ClockId, Error, FrequencyLimits, MAX_CLOCKS};
use crate::time::Hertz;

#[derive(Clone, Copy, Debug)]
struct Entry {
    id: ClockId,
    limits: FrequencyLimits,
}

/// Per clock frequency requirements, layered on top of the hardware
/// limits of the graph.
///
/// Each bound may be declared once per clock, and an exact frequency
/// excludes a minimum or maximum. Violations are recorded and reported
/// when the requirements are resolved.
///
/// Declaring any requirement on a leaf clock, or calling `enable`,
/// activates that leaf.
#[derive(Clone, Debug, Default)]
pub struct Requirements {
    entries: Vec<Entry, MAX_CLOCKS>,
    error: Option<Error>,
}

impl Requirements {
    /// No requirements
    pub fn new() -> Self {
        Self::default()
    }

    /// Require exactly `freq`
    pub fn exact<F>(mut self, id: ClockId, freq: F) -> Self
    where
        F: Into<Hertz>,
    {
        let hz = freq.into().0;
        self.record(id, |limits| {
            if limits.exact.is_some() {
                Err(Error::DuplicateRequirement(id))
            } else if limits.min.is_some() || limits.max.is_some() {
                Err(Error::ExactWithRange(id))
            } else {
                limits.exact = Some(hz);
                Ok(())
            }
        });
        self
    }

    /// Require at least `freq`
    pub fn min<F>(mut self, id: ClockId, freq: F) -> Self
    where
        F: Into<Hertz>,
    {
        let hz = freq.into().0;
        self.record(id, |limits| {
            if limits.min.is_some() {
                Err(Error::DuplicateRequirement(id))
            } else if limits.exact.is_some() {
                Err(Error::ExactWithRange(id))
            } else if limits.max.map_or(false, |max| hz > max) {
                Err(Error::InvertedRange(id))
            } else {
                limits.min = Some(hz);
                Ok(())
            }
        });
        self
    }

    /// Require at most `freq`
    pub fn max<F>(mut self, id: ClockId, freq: F) -> Self
    where
        F: Into<Hertz>,
    {
        let hz = freq.into().0;
        self.record(id, |limits| {
            if limits.max.is_some() {
                Err(Error::DuplicateRequirement(id))
            } else if limits.exact.is_some() {
                Err(Error::ExactWithRange(id))
            } else if limits.min.map_or(false, |min| hz < min) {
                Err(Error::InvertedRange(id))
            } else {
                limits.max = Some(hz);
                Ok(())
            }
        });
        self
    }

    /// Require a frequency between `min` and `max` inclusive
    pub fn range<F, G>(self, id: ClockId, min: F, max: G) -> Self
    where
        F: Into<Hertz>,
        G: Into<Hertz>,
    {
        self.min(id, min).max(id, max)
    }

    /// Activate a leaf clock without constraining its frequency
    pub fn enable(mut self, id: ClockId) -> Self {
        self.record(id, |_| Ok(()));
        self
    }

    /// The first configuration error, if any
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    /// Requirement declared for `id`
    pub fn get(&self, id: ClockId) -> Option<&FrequencyLimits> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.limits)
    }

    fn record<F>(&mut self, id: ClockId, f: F)
    where
        F: FnOnce(&mut FrequencyLimits) -> Result<(), Error>,
    {
        if self.error.is_none() {
            if let Err(e) = self.try_update(id, f) {
                self.error = Some(e);
            }
        }
    }

    fn try_update<F>(&mut self, id: ClockId, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut FrequencyLimits) -> Result<(), Error>,
    {
        let position = match self.entries.iter().position(|e| e.id == id) {
            Some(position) => position,
            None => {
                self.entries
                    .push(Entry {
                        id,
                        limits: FrequencyLimits::none(),
                    })
                    .map_err(|_| Error::CapacityExceeded)?;
                self.entries.len() - 1
            }
        };
        f(&mut self.entries[position].limits)
    }

    /// Combine the requirements with the hardware limits of `graph`.
    ///
    /// Returns the limits of every clock, indexed in declaration order,
    /// and the bitmap of active leaves.
    pub(crate) fn normalize(
        &self,
        graph: &ClockGraph,
    ) -> Result<(Vec<FrequencyLimits, MAX_CLOCKS>, u32), Error> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut active = graph.always_active();
        for entry in &self.entries {
            let index = graph
                .index_of(entry.id)
                .ok_or(Error::UnknownClock(entry.id))?;
            if graph.node(index).descriptor.leaf.is_some() {
                active |= 1 << index;
            }
        }

        let mut limits = Vec::new();
        for index in 0..graph.len() {
            let descriptor = &graph.node(index).descriptor;
            let user = self
                .get(descriptor.id)
                .copied()
                .unwrap_or_else(FrequencyLimits::none);
            let normalized = descriptor.limits.normalize(&user, descriptor.id)?;
            // Cannot overflow: the graph has at most MAX_CLOCKS clocks
            limits.push(normalized).ok();
        }

        Ok((limits, active))
    }
}
