//! Frequency limits

use super::{ClockId, Error};

/// Frequency constraint of a clock: either an exact frequency, or an
/// optional minimum and maximum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrequencyLimits {
    /// Required frequency in Hz
    pub exact: Option<u32>,
    /// Lowest permitted frequency in Hz
    pub min: Option<u32>,
    /// Highest permitted frequency in Hz
    pub max: Option<u32>,
}

impl FrequencyLimits {
    /// No constraint at all
    pub const fn none() -> Self {
        FrequencyLimits {
            exact: None,
            min: None,
            max: None,
        }
    }

    /// Exactly `hz`
    pub const fn exact(hz: u32) -> Self {
        FrequencyLimits {
            exact: Some(hz),
            min: None,
            max: None,
        }
    }

    /// Between `min` and `max` inclusive
    pub const fn range(min: u32, max: u32) -> Self {
        FrequencyLimits {
            exact: None,
            min: Some(min),
            max: Some(max),
        }
    }

    /// At least `min`
    pub const fn at_least(min: u32) -> Self {
        FrequencyLimits {
            exact: None,
            min: Some(min),
            max: None,
        }
    }

    /// At most `max`
    pub const fn at_most(max: u32) -> Self {
        FrequencyLimits {
            exact: None,
            min: None,
            max: Some(max),
        }
    }

    /// Returns true if any bound is set
    pub fn has_constraint(&self) -> bool {
        self.exact.is_some() || self.min.is_some() || self.max.is_some()
    }

    /// Returns true if `hz` satisfies these limits. Unset bounds do not
    /// constrain.
    pub fn is_frequency_ok(&self, hz: u32) -> bool {
        match self.exact {
            Some(exact) => hz == exact,
            None => {
                self.min.map_or(true, |min| hz >= min)
                    && self.max.map_or(true, |max| hz <= max)
            }
        }
    }

    /// Inclusive bounds, treating these limits as the hardware limits of
    /// a clock. Zero is never a valid frequency.
    pub(crate) fn bounds(&self) -> (u32, u32) {
        match self.exact {
            Some(exact) => (exact, exact),
            None => (self.min.unwrap_or(1), self.max.unwrap_or(u32::MAX)),
        }
    }

    /// Combine the hardware limits `self` with the requirement `user`.
    ///
    /// An exact requirement wins, but must be within the hardware limits.
    /// Otherwise missing bounds default to the hardware limits, and the
    /// result is clamped into them. The returned limits always have
    /// either `exact` or both `min` and `max` set.
    pub(crate) fn normalize(
        &self,
        user: &FrequencyLimits,
        id: ClockId,
    ) -> Result<FrequencyLimits, Error> {
        let (hard_min, hard_max) = self.bounds();

        if let Some(exact) = user.exact {
            if user.min.is_some() || user.max.is_some() {
                return Err(Error::ExactWithRange(id));
            }
            if exact < hard_min || exact > hard_max {
                return Err(Error::OutOfBounds(id));
            }
            return Ok(FrequencyLimits::exact(exact));
        }

        if let (Some(min), Some(max)) = (user.min, user.max) {
            if min > max {
                return Err(Error::InvertedRange(id));
            }
        }

        let min = user.min.unwrap_or(hard_min).max(hard_min).min(hard_max);
        let max = user.max.unwrap_or(hard_max).max(hard_min).min(hard_max);

        if min == max {
            Ok(FrequencyLimits::exact(min))
        } else {
            Ok(FrequencyLimits::range(min, max))
        }
    }
}
