//! Core data model: entity records, relation descriptors, time spans,
//! and the per-item processing state machine.

mod entity;
mod item_state;
mod timespan;

pub use entity::{EntityKind, EntityRecord, EntityStub, RelationDescriptor, RelationStatus};
pub use item_state::{ItemState, Outcome};
pub use timespan::{parse_role_spans, Bound, RoleSpans, TimeSpan};
