//! Time units

use core::fmt;

/// Hertz
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Default, Hash)]
pub struct Hertz(pub u32);

/// KiloHertz
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash)]
pub struct KiloHertz(pub u32);

/// MegaHertz
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash)]
pub struct MegaHertz(pub u32);

/// Extension trait that adds convenience methods to the `u32` type
pub trait U32Ext {
    /// Wrap in `Hertz`
    fn hz(self) -> Hertz;

    /// Wrap in `KiloHertz`
    fn khz(self) -> KiloHertz;

    /// Wrap in `MegaHertz`
    fn mhz(self) -> MegaHertz;
}

impl U32Ext for u32 {
    fn hz(self) -> Hertz {
        Hertz(self)
    }

    fn khz(self) -> KiloHertz {
        KiloHertz(self)
    }

    fn mhz(self) -> MegaHertz {
        MegaHertz(self)
    }
}

impl From<u32> for Hertz {
    fn from(hz: u32) -> Self {
        Hertz(hz)
    }
}

// Conversions saturate, so a frequency too large for a `u32` ends up
// out of bounds for every clock instead of wrapping around.

impl From<KiloHertz> for Hertz {
    fn from(khz: KiloHertz) -> Self {
        Hertz(khz.0.saturating_mul(1_000))
    }
}

impl From<MegaHertz> for Hertz {
    fn from(mhz: MegaHertz) -> Self {
        Hertz(mhz.0.saturating_mul(1_000_000))
    }
}

impl From<MegaHertz> for KiloHertz {
    fn from(mhz: MegaHertz) -> Self {
        KiloHertz(mhz.0.saturating_mul(1_000))
    }
}

impl fmt::Display for Hertz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000_000 && self.0 % 1_000 == 0 {
            write!(f, "{}.{:03} MHz", self.0 / 1_000_000, (self.0 / 1_000) % 1_000)
        } else if self.0 >= 1_000 && self.0 % 1_000 == 0 {
            write!(f, "{} kHz", self.0 / 1_000)
        } else {
            write!(f, "{} Hz", self.0)
        }
    }
}
