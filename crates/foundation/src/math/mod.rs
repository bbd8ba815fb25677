pub mod mercator;
pub mod vec;

pub use mercator::*;
pub use vec::*;
