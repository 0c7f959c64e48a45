//! Pipestack Core - Resource Graph Data Types
//!
//! Pure data structures shared by the stack compiler and its tests:
//! change-event wire types, typed field paths, IAM grants and queue
//! messages. No synthesis or configuration logic lives here.

mod enums;
mod error;
mod event;
mod iam;
mod intrinsic;
mod message;
mod path;

pub use enums::*;
pub use error::*;
pub use event::*;
pub use iam::*;
pub use intrinsic::*;
pub use message::*;
pub use path::*;

/// Partition key attribute of the reference source table.
pub const DEFAULT_PARTITION_KEY: &str = "id";

/// Delivery attempts from the stream before an event is given up on.
pub const DEFAULT_MAXIMUM_RETRY_ATTEMPTS: u32 = 3;

/// Log group receiving the pipe's execution traces.
pub const DEFAULT_LOG_GROUP_NAME: &str = "PipeDdbToSqsFifo";
