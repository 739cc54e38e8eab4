//! Media output for retroframe: PNG files, MP4 encoding with audio
//! passthrough, and the conversion debug log.

pub mod debug_log;
pub mod image;
pub mod muxer;
