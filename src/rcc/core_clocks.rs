//! Frozen core clock frequencies

use super::backup::RtcSource;
use super::id;
#[cfg(feature = "connectivity")]
use super::pll::Prediv1Source;
use crate::clock_tree::{ClockId, ResolvedClockTree};
use crate::time::Hertz;

/// Source of the system clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SysClkSource {
    /// High speed internal RC oscillator
    Hsi,
    /// High speed external oscillator
    Hse,
    /// PLL
    Pll,
}

/// Source of the PLL
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PllSource {
    /// HSI divided by 2
    HsiDiv2,
    /// PREDIV1, fed by HSE (or PLL2 on the connectivity line)
    Prediv1,
}

// Unused clocks have no parent
const NONE: ClockId = ClockId(u8::MAX);

/// Frozen core clock frequencies
///
/// The existence of this value indicates that the core clock
/// configuration can no longer be changed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clocks {
    tree: ResolvedClockTree,
}

impl Clocks {
    /// Wrap a valid resolution of the clock graph
    pub(super) fn new(tree: ResolvedClockTree) -> Self {
        Clocks { tree }
    }

    fn hz(&self, clock: ClockId) -> Hertz {
        self.tree.config_for(clock).frequency
    }

    fn factor(&self, clock: ClockId) -> u32 {
        self.tree.config_for(clock).prescaler_value
    }

    fn parent(&self, clock: ClockId) -> Option<ClockId> {
        match self.tree.parent_of(clock, NONE) {
            NONE => None,
            parent => Some(parent),
        }
    }

    /// Returns the system (core) frequency
    pub fn sysclk(&self) -> Hertz {
        self.hz(id::SYSCLK)
    }

    /// Returns the frequency of the AHB
    pub fn hclk(&self) -> Hertz {
        self.hz(id::HCLK)
    }

    /// Returns the frequency of the APB1
    pub fn pclk1(&self) -> Hertz {
        self.hz(id::PCLK1)
    }

    /// Returns the frequency of the APB2
    pub fn pclk2(&self) -> Hertz {
        self.hz(id::PCLK2)
    }

    /// Returns the frequency of the APB1 timers
    pub fn pclk1_tim(&self) -> Hertz {
        self.hz(id::TIMCLK1)
    }

    /// Returns the frequency of the APB2 timers
    pub fn pclk2_tim(&self) -> Hertz {
        self.hz(id::TIMCLK2)
    }

    /// Returns the ADC frequency
    pub fn adcclk(&self) -> Hertz {
        self.hz(id::ADCCLK)
    }

    /// Returns the USB frequency, if enabled
    pub fn usbclk(&self) -> Option<Hertz> {
        self.tree.frequency(id::USBCLK)
    }

    /// Returns the RTC frequency, if enabled
    pub fn rtcclk(&self) -> Option<Hertz> {
        self.tree.frequency(id::RTCCLK)
    }

    /// Returns the AHB prescaler
    pub fn hpre(&self) -> u16 {
        self.factor(id::HCLK) as u16
    }

    /// Returns the APB1 prescaler
    pub fn ppre1(&self) -> u8 {
        self.factor(id::PCLK1) as u8
    }

    /// Returns the APB2 prescaler
    pub fn ppre2(&self) -> u8 {
        self.factor(id::PCLK2) as u8
    }

    /// Returns the ADC prescaler
    pub fn adcpre(&self) -> u8 {
        self.factor(id::ADCCLK) as u8
    }

    /// Returns the PREDIV1 divider, if the PLL runs from it
    pub fn prediv1(&self) -> Option<u8> {
        if self.tree.is_used(id::PREDIV1) {
            Some(self.factor(id::PREDIV1) as u8)
        } else {
            None
        }
    }

    /// Returns the PLL multiplier, if the PLL is running
    pub fn pllmul(&self) -> Option<f32> {
        if self.tree.is_used(id::PLL) {
            let config = self.tree.config_for(id::PLL);
            Some(config.prescaler_value as f32 / config.prescaler_divisor as f32)
        } else {
            None
        }
    }

    /// Returns the PLL output frequency, if the PLL is running
    pub fn pll_ck(&self) -> Option<Hertz> {
        self.tree.frequency(id::PLL)
    }

    /// Returns the PLL2 output frequency, if PLL2 is running
    #[cfg(feature = "connectivity")]
    pub fn pll2_ck(&self) -> Option<Hertz> {
        self.tree.frequency(id::PLL2)
    }

    /// Returns the source of the system clock
    pub fn sysclk_source(&self) -> SysClkSource {
        match self.parent(id::SYSCLK) {
            Some(id::HSE) => SysClkSource::Hse,
            Some(id::PLL) => SysClkSource::Pll,
            _ => SysClkSource::Hsi,
        }
    }

    /// Returns the source of the PLL, if the PLL is running
    pub fn pll_source(&self) -> Option<PllSource> {
        match self.parent(id::PLL)? {
            id::HSI_DIV2 => Some(PllSource::HsiDiv2),
            _ => Some(PllSource::Prediv1),
        }
    }

    /// Returns the source of PREDIV1, if the PLL runs from it
    #[cfg(feature = "connectivity")]
    pub fn prediv1_source(&self) -> Option<Prediv1Source> {
        match self.parent(id::PREDIV1)? {
            id::PLL2 => Some(Prediv1Source::Pll2),
            _ => Some(Prediv1Source::Hse),
        }
    }

    /// Returns the source of the RTC clock, if enabled
    pub fn rtc_source(&self) -> Option<RtcSource> {
        self.parent(id::RTCCLK).and_then(RtcSource::from_parent)
    }

    /// Returns true if the USB clock runs at 48 MHz
    pub fn usbclk_valid(&self) -> bool {
        self.usbclk() == Some(Hertz(48_000_000))
    }

    /// The resolved clock tree behind these frequencies
    pub fn tree(&self) -> &ResolvedClockTree {
        &self.tree
    }
}
