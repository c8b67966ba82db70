//! Order book infrastructure
//!
//! Price levels and the side-parameterized book half.

pub mod price_level;
pub mod side;

pub use price_level::PriceLevel;
pub use side::BookSide;
