pub mod client;
pub mod protocol;

pub use client::{ChannelEvent, ChannelHandle};
