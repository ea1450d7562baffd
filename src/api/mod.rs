pub use kodub::*;

#[cfg(test)]
pub(crate) mod mock;
