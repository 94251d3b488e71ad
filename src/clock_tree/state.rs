//! Per clock working data of one resolution

use heapless::Vec;

use super::{FrequencyLimits, Prescaler};

/// Entries kept in each memo table
pub(crate) const CACHE_SIZE: usize = 8;

/// Search state of one clock.
///
/// `limits` and `allowed` live for one combination: fixing a frequency
/// narrows `limits` to it, and every pass compacts `allowed` to the
/// factors found valid. The rest is reset at the start of every pass.
#[derive(Clone, Debug)]
pub(crate) struct SearchState {
    /// Normalized limits, narrowed to an exact frequency once fixed
    pub(crate) limits: FrequencyLimits,
    /// Factors not yet ruled out
    pub(crate) allowed: u32,
    /// Factors found valid during this pass
    pub(crate) marked: u32,
    /// Lowest and highest frequency reached during this pass
    pub(crate) range: Option<(u32, u32)>,
    pub(crate) used: bool,
    offers: Vec<(u32, bool), CACHE_SIZE>,
    applied: Vec<u32, CACHE_SIZE>,
}

impl SearchState {
    pub(crate) fn new(limits: FrequencyLimits, prescaler: &Prescaler) -> Self {
        SearchState {
            limits,
            allowed: prescaler.all(),
            marked: 0,
            range: None,
            used: false,
            offers: Vec::new(),
            applied: Vec::new(),
        }
    }

    pub(crate) fn begin_pass(&mut self) {
        self.marked = 0;
        self.range = None;
        self.offers.clear();
        self.applied.clear();
    }

    /// Keep only the factors marked during the pass
    pub(crate) fn compact(&mut self) {
        self.allowed &= self.marked;
    }

    pub(crate) fn mark(&mut self, factor_index: usize, hz: u32) {
        self.marked |= 1 << factor_index;
        self.range = Some(match self.range {
            Some((lo, hi)) => (lo.min(hz), hi.max(hz)),
            None => (hz, hz),
        });
    }

    pub(crate) fn fix(&mut self, hz: u32) {
        self.limits = FrequencyLimits::exact(hz);
    }

    pub(crate) fn is_fixed(&self) -> bool {
        self.limits.exact.is_some()
    }

    /// Exactly one factor left
    pub(crate) fn is_determined(&self) -> bool {
        self.allowed.count_ones() == 1
    }

    /// Frequency of a determined clock
    pub(crate) fn frequency(&self) -> Option<u32> {
        self.limits.exact.or(self.range.map(|(lo, _)| lo))
    }

    pub(crate) fn cached_offer(&self, hz: u32) -> Option<bool> {
        self.offers
            .iter()
            .find(|(cached, _)| *cached == hz)
            .map(|&(_, accepted)| accepted)
    }

    pub(crate) fn remember_offer(&mut self, hz: u32, accepted: bool) {
        if self.offers.is_full() {
            self.offers.remove(0);
        }
        self.offers.push((hz, accepted)).ok();
    }

    /// Records `hz` as applied. Returns false if it already was.
    pub(crate) fn first_apply(&mut self, hz: u32) -> bool {
        if self.applied.contains(&hz) {
            return false;
        }
        if self.applied.is_full() {
            self.applied.remove(0);
        }
        self.applied.push(hz).ok();
        true
    }
}
