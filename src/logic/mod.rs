pub mod aggregate;
pub mod case_set;
pub mod hooks;
pub mod options;
pub mod patch;
pub mod record;
pub mod resolver;
pub mod upsert;

pub use aggregate::ResponseAggregator;
pub use case_set::CaseSetBuilder;
pub use hooks::{AcceptAll, HookContext, WriteHook};
pub use options::{within, BulkOptions, DeadlineExceeded};
pub use patch::BulkPatch;
pub use record::{ParsedRecord, RecordMode};
pub use resolver::ReferenceResolver;
pub use upsert::BulkUpsert;
