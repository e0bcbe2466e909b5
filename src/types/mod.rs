pub mod playback_state;
pub mod project;
pub mod segment;
pub mod session;
pub mod template;
