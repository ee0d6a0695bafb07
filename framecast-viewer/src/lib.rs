//! # framecast-viewer: screen stream viewer
//!
//! Connects to `framecast-server`, receives length-prefixed JPEG frames
//! over TCP and paints them into a native Win32 window until the server
//! disconnects, the window is closed, or the exit key is pressed.

pub mod config;
pub mod connection;
pub mod display;
pub mod sink;
pub mod window;
