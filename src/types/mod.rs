pub mod constants;
pub mod error;
pub mod message;

pub use constants::*;
pub use error::{LinkError, Result};
pub use message::{now_millis, FrameKind, StreamMessage};
