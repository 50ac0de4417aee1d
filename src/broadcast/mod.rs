/// Broadcast channel and connected viewer sessions
pub mod channel;
pub mod viewer;

pub use channel::{BroadcastChannel, ChannelEvent, PublishReport, Subscriber, SubscriberId};
pub use viewer::ViewerSession;
