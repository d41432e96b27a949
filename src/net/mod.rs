//! Host-authoritative networking: wire protocol, snapshot sync,
//! in-process transport, and session roles with host election.

pub mod protocol;
pub mod session;
pub mod sync;
pub mod transport;
