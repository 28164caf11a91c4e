pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

pub use logic::{BulkOptions, BulkPatch, BulkUpsert, HookContext, WriteHook};

pub use model::*;

pub use store::{MemoryStore, PostgresStore, Store};
