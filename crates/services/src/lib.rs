pub mod fanout;
pub mod hub;
pub mod keepalive;
pub mod metrics;
pub mod poller;
pub mod registry;
pub mod subscriber;

pub use fanout::*;
pub use hub::*;
pub use keepalive::*;
pub use metrics::*;
pub use poller::*;
pub use registry::*;
pub use subscriber::*;
