pub mod activity;
pub mod entity;
pub mod error;
pub mod generator;
pub mod id;
pub mod meta;
pub mod node;
pub mod time;

// Re-export commonly used types
pub use activity::{ActivityPayload, ActivityRecord, Verb};
pub use entity::{EntityHandle, NewHandle, TypeDefinition};
pub use error::CoreError;
pub use generator::{IdGenerator, ReservedId};
pub use id::{EdgeId, HandleId};
pub use meta::{MetaType, RelationType};
pub use node::{GraphEdge, GraphNode, PropertyMap};
