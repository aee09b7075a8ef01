//! Core value and identifier types.

mod id;
mod idgen;
mod value;

pub use id::{EdgeId, NodeId, TxId};
pub use idgen::IdGenerator;
pub use value::{HashableValue, PropertyKey, Value};
