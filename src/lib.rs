#[macro_use]
extern crate lazy_static;

pub mod libs;

pub use crate::libs::align::*;
pub use crate::libs::batch::*;
pub use crate::libs::context::*;
pub use crate::libs::corpus::*;
pub use crate::libs::output::*;
