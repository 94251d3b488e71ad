//! Clock source descriptors

use super::{ClockId, FrequencyLimits, Prescaler};

/// Custom rule relating the factor used by the parent to the factor this
/// clock may use: `fn(parent_factor, factor) -> allowed`.
///
/// The APB timer clocks are the motivating case: they run at the APB
/// frequency when the APB prescaler is 1, and at twice that otherwise.
pub type CompatibilityFn = fn(u32, u32) -> bool;

/// When a leaf clock takes part in the resolution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// Always required (core and bus clocks)
    Always,
    /// Only when the configuration enables it or sets a requirement on it
    OnRequest,
}

/// Static description of one clock source
#[derive(Clone, Debug)]
pub struct ClockSourceDescriptor {
    pub(crate) id: ClockId,
    pub(crate) name: &'static str,
    pub(crate) limits: FrequencyLimits,
    pub(crate) prescaler: Prescaler,
    pub(crate) compatible: Option<CompatibilityFn>,
    pub(crate) leaf: Option<Activation>,
}

impl ClockSourceDescriptor {
    /// A clock source without frequency limits
    pub fn new(id: ClockId, name: &'static str, prescaler: Prescaler) -> Self {
        ClockSourceDescriptor {
            id,
            name,
            limits: FrequencyLimits::none(),
            prescaler,
            compatible: None,
            leaf: None,
        }
    }

    /// Hardware frequency limits of the clock
    pub fn limits(mut self, limits: FrequencyLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Restrict the factors that may be combined with each parent factor
    pub fn compatible_with(mut self, rule: CompatibilityFn) -> Self {
        self.compatible = Some(rule);
        self
    }

    /// Mark the clock as a leaf of the tree
    pub fn leaf(mut self, activation: Activation) -> Self {
        self.leaf = Some(activation);
        self
    }

    /// Identifier
    pub fn id(&self) -> ClockId {
        self.id
    }

    /// Name used in log messages
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Prescaler
    pub fn prescaler(&self) -> &Prescaler {
        &self.prescaler
    }

    /// Hardware frequency limits
    pub fn frequency_limits(&self) -> &FrequencyLimits {
        &self.limits
    }

    /// Leaf activation, if this clock is a leaf
    pub fn activation(&self) -> Option<Activation> {
        self.leaf
    }

    /// Returns true if `hz` is within the hardware limits
    pub fn is_frequency_ok(&self, hz: u32) -> bool {
        self.limits.is_frequency_ok(hz)
    }

    /// Returns true if this clock may use `factor` while its parent uses
    /// `parent_factor`. Clocks without a rule accept any combination, and
    /// a root (no parent factor) is always compatible.
    pub fn is_prescaler_compatible(
        &self,
        parent_factor: Option<u32>,
        factor: u32,
    ) -> bool {
        match (self.compatible, parent_factor) {
            (Some(rule), Some(parent_factor)) => rule(parent_factor, factor),
            _ => true,
        }
    }

    /// Offers to this clock only depend on the offered frequency
    pub(crate) fn is_context_free(&self) -> bool {
        self.compatible.is_none()
    }
}
