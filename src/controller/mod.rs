pub use fetch::*;
pub use outcome::*;
pub use page::*;
pub use resolution::*;

mod fetch;
mod outcome;
mod page;
mod resolution;
mod sweep;
