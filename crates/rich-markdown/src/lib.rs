mod autoformat;
mod cache;
mod elements;
mod parse;
mod position;
mod registry;
mod serialize;
mod sync;
mod token;

pub use crate::autoformat::*;
pub use crate::cache::*;
pub use crate::parse::*;
pub use crate::position::*;
pub use crate::registry::*;
pub use crate::serialize::*;
pub use crate::sync::*;
pub use crate::token::*;
