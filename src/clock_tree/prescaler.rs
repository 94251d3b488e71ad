//! Prescalers
//!
//! A prescaler derives the frequency of a clock from the frequency of
//! its parent. Fractional ratios such as the USB ÷1.5 are expressed with
//! a common divisor: `divide(&[2, 3]).with_divisor(2)` offers ÷1 and
//! ÷1.5.

use heapless::Vec;

use super::{Error, MAX_FACTORS};

/// Direction of the transform applied by a [`Prescaler`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrescalerKind {
    /// child = (parent / divisor) * factor
    Multiply,
    /// child = (parent * divisor) / factor
    Divide,
}

/// Admissible factors of a clock, in order of preference
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prescaler {
    kind: PrescalerKind,
    factors: Vec<u32, MAX_FACTORS>,
    divisor: u32,
    overflow: bool,
}

impl Prescaler {
    fn new(kind: PrescalerKind, factors: &[u32]) -> Self {
        let mut list = Vec::new();
        let mut overflow = false;
        for &factor in factors {
            overflow |= list.push(factor).is_err();
        }
        Prescaler {
            kind,
            factors: list,
            divisor: 1,
            overflow,
        }
    }

    /// A multiplier (PLL, timer ×2) with the given factors
    pub fn multiply(factors: &[u32]) -> Self {
        Self::new(PrescalerKind::Multiply, factors)
    }

    /// A divider (bus prescaler, PLL predivider) with the given factors
    pub fn divide(factors: &[u32]) -> Self {
        Self::new(PrescalerKind::Divide, factors)
    }

    /// A mux or a plain connection: divide by one
    pub fn passthrough() -> Self {
        Self::divide(&[1])
    }

    /// Set a common divisor applied to the parent frequency before a
    /// multiplication, or multiplied into it before a division
    pub fn with_divisor(mut self, divisor: u32) -> Self {
        self.divisor = divisor;
        self
    }

    /// Kind of transform
    pub fn kind(&self) -> PrescalerKind {
        self.kind
    }

    /// Common divisor
    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    /// Candidate factors
    pub fn factors(&self) -> &[u32] {
        &self.factors
    }

    /// Factor at `index`, or zero if there is none
    pub fn factor(&self, index: usize) -> u32 {
        self.factors.get(index).copied().unwrap_or(0)
    }

    /// Number of populated, non-zero factors
    pub fn count(&self) -> usize {
        self.factors.iter().filter(|&&f| f != 0).count()
    }

    /// A prescaler always has at least one candidate factor
    pub fn is_valid(&self) -> bool {
        self.factors.first().map_or(false, |&f| f != 0)
    }

    /// Frequency of a child clocked from `parent_hz` through the factor at
    /// `index`.
    ///
    /// Returns `None` for a missing factor, and for results that are zero
    /// or do not fit in 32 bits.
    pub fn child_frequency(&self, parent_hz: u32, index: usize) -> Option<u32> {
        let factor = u64::from(self.factor(index));
        let divisor = u64::from(self.divisor);
        if factor == 0 || divisor == 0 {
            return None;
        }

        let parent_hz = u64::from(parent_hz);
        let hz = match self.kind {
            PrescalerKind::Multiply => (parent_hz / divisor) * factor,
            PrescalerKind::Divide => (parent_hz * divisor) / factor,
        };

        match cast::u32(hz) {
            Ok(hz) if hz != 0 => Some(hz),
            _ => None,
        }
    }

    /// Bitmap with one bit per candidate factor
    pub(crate) fn all(&self) -> u32 {
        match self.factors.len() {
            32 => u32::MAX,
            n => (1 << n) - 1,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.overflow {
            return Err(Error::CapacityExceeded);
        }
        if !self.is_valid()
            || self.divisor == 0
            || self.count() != self.factors.len()
        {
            return Err(Error::InvalidPrescaler);
        }
        for (i, factor) in self.factors.iter().enumerate() {
            if self.factors[..i].contains(factor) {
                return Err(Error::InvalidPrescaler);
            }
        }
        Ok(())
    }
}
