pub mod batch;
pub mod common;
pub mod entities;
pub mod resolution;
pub mod table;
pub mod write;

pub use batch::*;
pub use common::*;
pub use entities::spec;
pub use resolution::*;
pub use table::*;
pub use write::*;
