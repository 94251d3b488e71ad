//! Prelude
pub use crate::clock_tree::Direction;
pub use crate::time::U32Ext as _stm32f1xx_clocks_time_U32Ext;
