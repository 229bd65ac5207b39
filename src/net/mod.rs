//! Network command channels: bounded TCP client pool plus a
//! connectionless UDP responder, polled from the main command loop.

pub mod server;
