//! TCP connection establishment for both sides.

pub mod connection;

pub use connection::{
    ConnectionInfo, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT, accept_one, bind, connect, connect_hint,
};
