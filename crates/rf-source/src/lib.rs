//! Media input for retroframe: still images and ffmpeg-decoded video.

pub mod image;
pub mod video;
