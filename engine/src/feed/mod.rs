pub mod connection;

pub use connection::{Backoff, ConnectionEvent, ConnectionState, FeedConnection};
