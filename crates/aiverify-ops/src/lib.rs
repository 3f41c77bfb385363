//! Filesystem operations used by the plugin lifecycle.
//!
//! Installing a plugin moves its staged directory under the plugins root;
//! deleting a plugin removes that directory again. Both run the blocking
//! filesystem work on tokio's blocking pool.

mod move_op;
mod operation;
mod remove;

pub use move_op::{move_dir, MoveOptions, MoveOutcome, MoveStrategy};
pub use operation::OperationError;
pub use remove::remove_dir;
