//! convkv-wire: the vocabulary shared between the mapping layer and a
//! convergent key-value store.
//!
//! - **types**: operation trees, response trees, causal contexts, siblings,
//!   raw command results and time-series cells.
//! - **traits**: the [`Transport`] seam a store connection implements.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Result, TransportError};
pub use traits::Transport;
pub use types::{
    CausalContext, ConflictObject, CrdtKind, Location, MapOperation, MapValue, Operation,
    RawCommandResult, RawObject, ResolvedConflict, ResponseValue, SetOperation, TsCell, TsRow,
    ValueWrite,
};
