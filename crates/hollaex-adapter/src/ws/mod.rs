/*
[INPUT]:  Stream configuration, credentials and subscription topics
[OUTPUT]: Real-time market and account events over one managed socket
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new channels or changing connection logic
*/

mod connection;
pub mod message;
pub mod registry;
pub mod session;
pub mod topic;

pub use message::{ClientFrame, StreamEvent, StreamMessage};
pub use registry::SubscriptionRegistry;
pub use session::{SessionState, StreamSession};
pub use topic::{Channel, Topic};
