pub mod handle;
pub mod message;
pub mod progress;
