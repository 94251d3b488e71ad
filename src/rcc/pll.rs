//! Phase Locked Loop Configuration
//!
//! The PLL is fed either by HSI / 2 or by PREDIV1. On the connectivity
//! line PREDIV1 may in turn be fed by PLL2, and the PLL multiplier is
//! expressed in halves to cover x6.5.

use super::id;
use crate::clock_tree::{
    Activation, ClockGraphBuilder, ClockSourceDescriptor, FrequencyLimits, Prescaler,
};

const PLL_MIN: u32 = 16_000_000;
const PLL_MAX: u32 = 72_000_000;
const USB: u32 = 48_000_000;

#[cfg(not(feature = "connectivity"))]
const PREDIV1: &[u32] = &[1, 2];
#[cfg(feature = "connectivity")]
const PREDIV1: &[u32] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];

/// PLLMUL x2 to x16
#[cfg(not(feature = "connectivity"))]
const PLLMUL: &[u32] = &[2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
/// PLLMUL x4 to x9 and x6.5, in halves
#[cfg(feature = "connectivity")]
const PLLMUL: &[u32] = &[8, 10, 12, 13, 14, 16, 18];
#[cfg(not(feature = "connectivity"))]
const PLLMUL_DIVISOR: u32 = 1;
#[cfg(feature = "connectivity")]
const PLLMUL_DIVISOR: u32 = 2;

/// Source of PREDIV1
#[cfg(feature = "connectivity")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prediv1Source {
    /// High speed external oscillator
    Hse,
    /// PLL2
    Pll2,
}

#[cfg(not(feature = "connectivity"))]
fn prediv1() -> ClockSourceDescriptor {
    ClockSourceDescriptor::new(id::PREDIV1, "PREDIV1", Prescaler::divide(PREDIV1))
        .limits(FrequencyLimits::range(1_000_000, 25_000_000))
}

#[cfg(feature = "connectivity")]
fn prediv1() -> ClockSourceDescriptor {
    // PLL input range
    ClockSourceDescriptor::new(id::PREDIV1, "PREDIV1", Prescaler::divide(PREDIV1))
        .limits(FrequencyLimits::range(3_000_000, 12_000_000))
}

fn pll() -> ClockSourceDescriptor {
    ClockSourceDescriptor::new(
        id::PLL,
        "PLL",
        Prescaler::multiply(PLLMUL).with_divisor(PLLMUL_DIVISOR),
    )
    .limits(FrequencyLimits::range(PLL_MIN, PLL_MAX))
}

/// USB prescaler: PLL / 1 or PLL / 1.5
pub(super) fn usb() -> ClockSourceDescriptor {
    ClockSourceDescriptor::new(
        id::USBCLK,
        "USBCLK",
        Prescaler::divide(&[2, 3]).with_divisor(2),
    )
    .limits(FrequencyLimits::exact(USB))
    .leaf(Activation::OnRequest)
}

/// Declare PREDIV1 and the PLL
#[cfg(not(feature = "connectivity"))]
pub(super) fn add_pll(builder: ClockGraphBuilder) -> ClockGraphBuilder {
    builder
        .clock(prediv1(), &[id::HSE])
        .clock(pll(), &[id::HSI_DIV2, id::PREDIV1])
}

/// Declare PREDIV2, PLL2, PREDIV1 and the PLL
#[cfg(feature = "connectivity")]
pub(super) fn add_pll(builder: ClockGraphBuilder) -> ClockGraphBuilder {
    builder
        .clock(
            ClockSourceDescriptor::new(
                id::PREDIV2,
                "PREDIV2",
                Prescaler::divide(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
            )
            .limits(FrequencyLimits::range(3_000_000, 5_000_000)),
            &[id::HSE],
        )
        .clock(
            ClockSourceDescriptor::new(
                id::PLL2,
                "PLL2",
                Prescaler::multiply(&[8, 9, 10, 11, 12, 13, 14, 16, 20]),
            )
            .limits(FrequencyLimits::range(40_000_000, 74_000_000)),
            &[id::PREDIV2],
        )
        .clock(prediv1(), &[id::HSE, id::PLL2])
        .clock(pll(), &[id::HSI_DIV2, id::PREDIV1])
}
