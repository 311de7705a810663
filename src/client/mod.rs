//! ADB session client: handshake, stream multiplexing, services.

mod session;
mod sink;

#[cfg(test)]
mod tests;

pub use session::AdbSession;
pub use sink::StreamSink;
