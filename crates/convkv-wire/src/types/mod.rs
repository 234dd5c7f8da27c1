pub mod command;
pub mod conflict;
pub mod context;
pub mod kind;
pub mod operation;
pub mod response;
pub mod ts;

pub use command::{Location, RawCommandResult, ValueWrite};
pub use conflict::{ConflictObject, RawObject, ResolvedConflict};
pub use context::CausalContext;
pub use kind::CrdtKind;
pub use operation::{MapOperation, Operation, SetOperation};
pub use response::{MapValue, ResponseValue};
pub use ts::{ts_time_format, TsCell, TsRow};
