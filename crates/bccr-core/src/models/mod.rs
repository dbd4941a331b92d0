mod channel;
mod item;
mod thread;

pub use channel::{Channel, ChannelMetadata, ChannelMetadataUpdate, ItemOutcome};
pub use item::Item;
pub use thread::Thread;
