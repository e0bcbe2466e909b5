pub mod drag;
pub mod editor;
pub mod geometry;
pub mod segment_store;
pub mod template_ops;
