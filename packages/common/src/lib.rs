pub mod collectors;
pub mod visitor;

pub use collectors::*;
pub use visitor::*;
