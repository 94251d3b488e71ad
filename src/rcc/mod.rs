//! Reset and Clock Control
//!
//! This module works out the RCC settings that provide set frequencies
//! for the system clock `sys_ck`, the AMBA High-performance Bus `hclk`,
//! the AMBA Peripheral Busses `pclkN`, their timer clocks, the ADC
//! clock, the USB clock and the RTC clock.
//!
//! See Figure 8 "Clock tree" in Reference Manual RM0008 for the low-,
//! medium-, high- and XL-density devices, and Figure 11 for the
//! connectivity line (feature `connectivity`).
//!
//! HSI is 8 MHz.
//! LSI is 40 kHz.
//!
//! # Usage
//!
//! A builder pattern is used to specify the state and frequency of
//! possible clocks. The `freeze` method searches the whole clock tree for
//! a configuration that meets every specification, and returns the
//! frozen [`Clocks`](struct.Clocks.html).
//!
//! No clock specification overrides another. Clocks that are not
//! specified run as fast as the others allow, or as slow with
//! `prefer_lowest`. The frequencies of the specified clocks in turn
//! influence the choice of the PLL multiplier and of every bus prescaler.
//! If no configuration meets all specifications, `freeze` will panic.
//!
//! # Configuration Example
//!
//! A simple example:
//!
//! ```rust
//! use stm32f1xx_clocks::prelude::*;
//! use stm32f1xx_clocks::rcc::Rcc;
//!
//! let clocks = Rcc::new().sys_ck(24.mhz()).freeze();
//! assert_eq!(clocks.sysclk().0, 24_000_000);
//! ```
//!
//! Using an external crystal, the USB peripheral and the RTC:
//!
//! ```rust
//! use stm32f1xx_clocks::prelude::*;
//! use stm32f1xx_clocks::rcc::{Rcc, RtcSource};
//!
//! let clocks = Rcc::new()
//!     .use_hse(8.mhz()) // XTAL X1
//!     .use_lse() // XTAL X2
//!     .usbclk(48.mhz())
//!     .rtcclk(32_768.hz())
//!     .pclk1_max(24.mhz())
//!     .freeze();
//!
//! assert_eq!(clocks.sysclk().0, 72_000_000);
//! assert_eq!(clocks.pclk1().0, 18_000_000);
//! assert_eq!(clocks.pclk1_tim().0, 36_000_000);
//! assert!(clocks.usbclk_valid());
//! assert_eq!(clocks.rtc_source(), Some(RtcSource::Lse));
//! ```
#![deny(missing_docs)]

use core::fmt;

use log::debug;

use crate::clock_tree::{
    resolve, Activation, ClockGraph, ClockSourceDescriptor, Direction,
    Error, FrequencyLimits, Prescaler, Requirements,
};
use crate::time::Hertz;

mod backup;
mod core_clocks;
mod pll;

pub use backup::RtcSource;
pub use core_clocks::{Clocks, PllSource, SysClkSource};
#[cfg(feature = "connectivity")]
pub use pll::Prediv1Source;

/// Identifiers of the clocks of the STM32F1 clock tree
pub mod id {
    use crate::clock_tree::ClockId;

    /// High speed internal RC oscillator
    pub const HSI: ClockId = ClockId(0);
    /// High speed external oscillator
    pub const HSE: ClockId = ClockId(1);
    /// Low speed internal RC oscillator
    pub const LSI: ClockId = ClockId(2);
    /// Low speed external oscillator
    pub const LSE: ClockId = ClockId(3);
    /// HSI divided by 2, PLL input
    pub const HSI_DIV2: ClockId = ClockId(4);
    /// PLL input prescaler
    pub const PREDIV1: ClockId = ClockId(5);
    /// Main PLL
    pub const PLL: ClockId = ClockId(6);
    /// System clock mux
    pub const SYSCLK: ClockId = ClockId(7);
    /// AHB prescaler
    pub const HCLK: ClockId = ClockId(8);
    /// APB1 prescaler
    pub const PCLK1: ClockId = ClockId(9);
    /// APB2 prescaler
    pub const PCLK2: ClockId = ClockId(10);
    /// Timers on APB1
    pub const TIMCLK1: ClockId = ClockId(11);
    /// Timers on APB2
    pub const TIMCLK2: ClockId = ClockId(12);
    /// ADC prescaler
    pub const ADCCLK: ClockId = ClockId(13);
    /// USB prescaler
    pub const USBCLK: ClockId = ClockId(14);
    /// HSE divided by 128, RTC input
    pub const HSE_DIV128: ClockId = ClockId(15);
    /// RTC clock mux
    pub const RTCCLK: ClockId = ClockId(16);
    /// PLL2 input prescaler
    #[cfg(feature = "connectivity")]
    pub const PREDIV2: ClockId = ClockId(17);
    /// PLL2
    #[cfg(feature = "connectivity")]
    pub const PLL2: ClockId = ClockId(18);
}

const HSI: u32 = 8_000_000; // Hz
const LSE: u32 = 32_768; // Hz

#[cfg(not(feature = "connectivity"))]
const HSE_MIN: u32 = 4_000_000;
#[cfg(not(feature = "connectivity"))]
const HSE_MAX: u32 = 16_000_000;
#[cfg(feature = "connectivity")]
const HSE_MIN: u32 = 3_000_000;
#[cfg(feature = "connectivity")]
const HSE_MAX: u32 = 25_000_000;

const SYSCLK_MAX: u32 = 72_000_000;
const PCLK1_MAX: u32 = 36_000_000;
const ADCCLK_MIN: u32 = 600_000;
const ADCCLK_MAX: u32 = 14_000_000;

/// Allowed timer multipliers: the timers run at the APB frequency when the
/// APB prescaler is 1, and at twice the APB frequency otherwise.
fn timer_multiplier(ppre: u32, multiplier: u32) -> bool {
    if ppre == 1 {
        multiplier == 1
    } else {
        multiplier == 2
    }
}

/// The clock tree of the selected device line
///
/// HSE and LSE have no frequency of their own: they only take part when
/// `use_hse` and `use_lse` supply one.
pub fn clock_graph() -> Result<ClockGraph, Error> {
    let builder = ClockGraph::builder()
        .clock(
            ClockSourceDescriptor::new(id::HSI, "HSI", Prescaler::passthrough())
                .limits(FrequencyLimits::exact(HSI)),
            &[],
        )
        .clock(
            ClockSourceDescriptor::new(id::HSE, "HSE", Prescaler::passthrough())
                .limits(FrequencyLimits::range(HSE_MIN, HSE_MAX)),
            &[],
        )
        .clock(backup::lsi(), &[])
        .clock(backup::lse(), &[])
        .clock(
            ClockSourceDescriptor::new(id::HSI_DIV2, "HSI/2", Prescaler::divide(&[2])),
            &[id::HSI],
        );

    let builder = pll::add_pll(builder)
        .clock(
            ClockSourceDescriptor::new(id::SYSCLK, "SYSCLK", Prescaler::passthrough())
                .limits(FrequencyLimits::at_most(SYSCLK_MAX)),
            &[id::HSI, id::HSE, id::PLL],
        )
        .clock(
            ClockSourceDescriptor::new(
                id::HCLK,
                "HCLK",
                Prescaler::divide(&[1, 2, 4, 8, 16, 64, 128, 256, 512]),
            ),
            &[id::SYSCLK],
        )
        .clock(
            ClockSourceDescriptor::new(id::PCLK1, "PCLK1", Prescaler::divide(&[1, 2, 4, 8, 16]))
                .limits(FrequencyLimits::at_most(PCLK1_MAX)),
            &[id::HCLK],
        )
        .clock(
            ClockSourceDescriptor::new(id::PCLK2, "PCLK2", Prescaler::divide(&[1, 2, 4, 8, 16]))
                .limits(FrequencyLimits::at_most(SYSCLK_MAX)),
            &[id::HCLK],
        )
        .clock(
            ClockSourceDescriptor::new(id::TIMCLK1, "TIMCLK1", Prescaler::multiply(&[1, 2]))
                .compatible_with(timer_multiplier)
                .leaf(Activation::Always),
            &[id::PCLK1],
        )
        .clock(
            ClockSourceDescriptor::new(id::TIMCLK2, "TIMCLK2", Prescaler::multiply(&[1, 2]))
                .compatible_with(timer_multiplier)
                .leaf(Activation::Always),
            &[id::PCLK2],
        )
        .clock(
            ClockSourceDescriptor::new(id::ADCCLK, "ADCCLK", Prescaler::divide(&[2, 4, 6, 8]))
                .limits(FrequencyLimits::range(ADCCLK_MIN, ADCCLK_MAX))
                .leaf(Activation::Always),
            &[id::PCLK2],
        )
        .clock(pll::usb(), &[id::PLL]);

    backup::add_rtc(builder)
        .priority(&[
            id::SYSCLK,
            id::HCLK,
            id::PCLK2,
            id::PCLK1,
            id::ADCCLK,
            id::TIMCLK2,
            id::TIMCLK1,
            id::USBCLK,
            id::RTCCLK,
        ])
        .build()
}

/// Configuration of the core clocks
///
/// Every setter call is recorded as it is made, so declaring the same
/// bound of a clock twice is reported by `try_freeze` instead of the
/// second call replacing the first.
#[derive(Clone, Debug, Default)]
pub struct Config {
    requirements: Requirements,
    lse: bool,
    direction: Direction,
}

impl Config {
    /// Frequency requirements of this configuration
    pub fn requirements(&self) -> Requirements {
        let requirements = self.requirements.clone();
        if self.lse {
            requirements.exact(id::LSE, Hertz(LSE))
        } else {
            requirements
        }
    }
}

/// Reset and Clock Control
///
/// ```rust
/// use stm32f1xx_clocks::rcc::Rcc;
///
/// let rcc = Rcc::new();
/// let clocks = rcc.freeze();
/// ```
#[derive(Clone, Debug, Default)]
pub struct Rcc {
    config: Config,
}

/// Error returned by [`Rcc::try_freeze`](struct.Rcc.html#method.try_freeze)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreezeError {
    /// The clock specifications are inconsistent
    Config(Error),
    /// No configuration of the clock tree meets the specifications
    Infeasible,
}

impl From<Error> for FreezeError {
    fn from(e: Error) -> Self {
        FreezeError::Config(e)
    }
}

impl fmt::Display for FreezeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FreezeError::Config(e) => write!(f, "invalid clock configuration: {}", e),
            FreezeError::Infeasible => {
                f.write_str("no clock configuration meets the requirements")
            }
        }
    }
}

/// Setters for the exact frequency of a clock, and for its lower and
/// upper bound
macro_rules! clock_setter {
    ($($name:ident: $clock:ident, $what:literal,)+) => {
        $(
            paste::paste! {
                #[doc = "Set the frequency of " $what " to exactly `freq`"]
                pub fn $name<F>(self, freq: F) -> Self
                where
                    F: Into<Hertz>,
                {
                    self.require(|r| r.exact(id::$clock, freq))
                }

                #[doc = "Set the lowest acceptable frequency of " $what]
                #[doc = ""]
                #[doc = "A bound above the hardware maximum is lowered to that maximum."]
                pub fn [<$name _min>]<F>(self, freq: F) -> Self
                where
                    F: Into<Hertz>,
                {
                    self.require(|r| r.min(id::$clock, freq))
                }

                #[doc = "Set the highest acceptable frequency of " $what]
                #[doc = ""]
                #[doc = "A bound below the hardware minimum is raised to that minimum."]
                pub fn [<$name _max>]<F>(self, freq: F) -> Self
                where
                    F: Into<Hertz>,
                {
                    self.require(|r| r.max(id::$clock, freq))
                }
            }
        )+
    };
}

impl Rcc {
    /// RCC with nothing specified: every clock runs from HSI, as fast as
    /// possible
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses HSE (external oscillator) instead of HSI (internal RC
    /// oscillator) as the clock source. Will result in a hang if an
    /// external oscillator is not connected or it fails to start.
    pub fn use_hse<F>(self, freq: F) -> Self
    where
        F: Into<Hertz>,
    {
        self.require(|r| r.exact(id::HSE, freq))
    }

    /// Makes the 32.768 kHz external crystal available to the RTC
    pub fn use_lse(mut self) -> Self {
        self.config.lse = true;
        self
    }

    /// Enables the USB clock without specifying its frequency
    pub fn enable_usb(self) -> Self {
        self.require(|r| r.enable(id::USBCLK))
    }

    /// Enables the RTC clock without specifying its frequency
    pub fn enable_rtc(self) -> Self {
        self.require(|r| r.enable(id::RTCCLK))
    }

    /// Unspecified clocks run as fast as possible. This is the default.
    pub fn prefer_highest(mut self) -> Self {
        self.config.direction = Direction::PreferHighest;
        self
    }

    /// Unspecified clocks run as slow as possible
    pub fn prefer_lowest(mut self) -> Self {
        self.config.direction = Direction::PreferLowest;
        self
    }

    fn require<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Requirements) -> Requirements,
    {
        self.config.requirements = f(self.config.requirements);
        self
    }

    clock_setter! {
        sys_ck: SYSCLK, "the system clock",
        hclk: HCLK, "the AHB bus",
        pclk1: PCLK1, "the APB1 bus",
        pclk2: PCLK2, "the APB2 bus",
        adcclk: ADCCLK, "the ADC clock",
        pll_ck: PLL, "the PLL output",
        usbclk: USBCLK, "the USB clock, enabling it,",
        rtcclk: RTCCLK, "the RTC clock, enabling it,",
    }

    /// The configuration collected so far
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Search for a clock configuration that meets every specification
    pub fn try_freeze(self) -> Result<Clocks, FreezeError> {
        let graph = clock_graph()?;
        let requirements = self.config.requirements();
        let tree = resolve(&graph, &requirements, self.config.direction)?;

        if !tree.is_valid() {
            return Err(FreezeError::Infeasible);
        }

        let clocks = Clocks::new(tree);
        debug!(
            "SYSCLK {} HCLK {} PCLK1 {} PCLK2 {}",
            clocks.sysclk(),
            clocks.hclk(),
            clocks.pclk1(),
            clocks.pclk2()
        );
        Ok(clocks)
    }

    /// Freeze the core clocks, returning a Clocks object
    ///
    /// # Panics
    ///
    /// If the specifications are inconsistent, or no configuration of the
    /// clock tree meets them
    pub fn freeze(self) -> Clocks {
        match self.try_freeze() {
            Ok(clocks) => clocks,
            Err(e) => panic!("Cannot freeze the clock tree: {}", e),
        }
    }
}
