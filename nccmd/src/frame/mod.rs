//! Byte-level framing for the two NETCONF wire formats.
//!
//! NETCONF 1.0 terminates each message with a literal `]]>]]>` marker;
//! NETCONF 1.1 carries messages as length-prefixed chunks ending in `##`.
//! Both decoders are built on the same line-reading primitive and keep no
//! state between messages.

mod line;
pub mod v10;
pub mod v11;

pub(crate) use line::read_frame_line;
