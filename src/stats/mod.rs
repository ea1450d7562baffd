pub use aggregate::*;
pub use medal::*;
pub use sort::*;

mod aggregate;
mod medal;
mod sort;
