//! Backup domain clocks
//!
//! The RTC runs from LSE, LSI or HSE / 128.

use super::id;
use crate::clock_tree::{
    Activation, ClockGraphBuilder, ClockId, ClockSourceDescriptor, FrequencyLimits,
    Prescaler,
};

const LSI: u32 = 40_000; // Hz
/// External clocks up to 1 MHz may drive OSC32_IN in bypass mode
const LSE_MAX: u32 = 1_000_000; // Hz

/// RTC clock source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RtcSource {
    /// Low speed external oscillator
    Lse,
    /// Low speed internal RC oscillator
    Lsi,
    /// High speed external oscillator divided by 128
    HseDiv128,
}

impl RtcSource {
    pub(super) fn from_parent(parent: ClockId) -> Option<Self> {
        match parent {
            id::LSE => Some(RtcSource::Lse),
            id::LSI => Some(RtcSource::Lsi),
            id::HSE_DIV128 => Some(RtcSource::HseDiv128),
            _ => None,
        }
    }
}

pub(super) fn lsi() -> ClockSourceDescriptor {
    ClockSourceDescriptor::new(id::LSI, "LSI", Prescaler::passthrough())
        .limits(FrequencyLimits::exact(LSI))
}

pub(super) fn lse() -> ClockSourceDescriptor {
    ClockSourceDescriptor::new(id::LSE, "LSE", Prescaler::passthrough())
        .limits(FrequencyLimits::at_most(LSE_MAX))
}

/// Declare HSE / 128 and the RTC mux
pub(super) fn add_rtc(builder: ClockGraphBuilder) -> ClockGraphBuilder {
    builder
        .clock(
            ClockSourceDescriptor::new(id::HSE_DIV128, "HSE/128", Prescaler::divide(&[128])),
            &[id::HSE],
        )
        .clock(
            ClockSourceDescriptor::new(id::RTCCLK, "RTCCLK", Prescaler::passthrough())
                .leaf(Activation::OnRequest),
            &[id::LSE, id::LSI, id::HSE_DIV128],
        )
}
