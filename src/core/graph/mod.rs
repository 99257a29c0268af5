//! Schema-to-canvas graph: derivation, sanitization, synchronization and
//! reconciliation of user gestures.

mod boundary;
mod edges;
mod model;
mod reconcile;
mod selection;
mod sanitize;
mod sync;

pub use boundary::*;
pub use edges::*;
pub use model::*;
pub use reconcile::*;
pub use sanitize::*;
pub use selection::*;
pub use sync::*;
