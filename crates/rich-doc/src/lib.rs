mod apply;
mod commands;
mod diff;
mod editor;
mod node;
mod ops;
mod schema;

pub use crate::apply::*;
pub use crate::commands::*;
pub use crate::diff::*;
pub use crate::editor::*;
pub use crate::node::*;
pub use crate::ops::*;
pub use crate::schema::*;
