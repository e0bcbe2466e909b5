pub mod gst_player;
pub mod playback_watcher;
pub mod ticker;
pub mod time_source;
