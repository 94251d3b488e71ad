//! Clock tree configuration for the STM32F1 family of microcontrollers
//!
//! The heart of this crate is a device independent clock tree
//! resolver ([`clock_tree`]). Given a graph of oscillators, PLLs and
//! bus prescalers, each with its own admissible factors and frequency
//! limits, it finds the parent selection and prescaler settings that
//! satisfy every constraint, and of all such settings the one that
//! gives the highest (or lowest) frequencies in a fixed priority
//! order.
//!
//! The [`rcc`] module describes the STM32F1 clock tree (RM0008 Fig. 8,
//! or Fig. 11 for connectivity line devices) with this machinery and
//! offers the usual builder interface on top of it.
//!
//! ```rust
//! use stm32f1xx_clocks::prelude::*;
//! use stm32f1xx_clocks::rcc::Rcc;
//!
//! let clocks = Rcc::new()
//!     .use_hse(8.mhz())
//!     .sys_ck(72.mhz())
//!     .freeze();
//!
//! assert_eq!(clocks.pclk1().0, 36_000_000);
//! ```
//!
//! Nothing in here touches hardware registers; the result is meant to
//! be consumed by the register level code of a HAL.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

pub mod clock_tree;
pub mod prelude;
pub mod rcc;
pub mod time;
