pub use calls::*;
pub use structs::*;

mod calls;
pub mod structs;
