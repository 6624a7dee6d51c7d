//! Library surface for the ELG gateway binary: split out so integration
//! tests can drive `handle_connection` directly against a loopback socket.

pub mod config;
pub mod context;
pub mod handlers;
