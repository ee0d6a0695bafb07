//! # framecast-server: screen streaming server
//!
//! Listens for one viewer, captures the local screen via DXGI Desktop
//! Duplication, encodes each frame as JPEG and streams it over TCP as
//! length-prefixed frames until the viewer disconnects or the process
//! is stopped.

pub mod config;
pub mod service;
