//! Kernel functions

pub mod function;
pub mod ops;
pub mod traits;

pub use self::function::*;
pub use self::traits::*;
