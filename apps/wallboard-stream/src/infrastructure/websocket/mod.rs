//! WebSocket Subscriber Transport
//!
//! Bridges an upgraded axum WebSocket to the snapshot service:
//!
//! ```text
//!  SubscriberRegistry ──► ChannelSink ──mpsc──► writer task ──► WebSocket
//!                                                                  │
//!  SubscriberSession ◄── InboundEvent stream ◄─────────────────────┘
//! ```
//!
//! The registry never awaits the socket: sends go into a bounded queue and
//! a full queue counts as a failed send.

mod connection;
mod sink;

pub use connection::{ConnectionSettings, serve_socket};
pub use sink::ChannelSink;
