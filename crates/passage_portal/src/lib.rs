pub mod config;
pub mod crossing;
pub mod error;
pub mod gate;
pub mod player;
pub mod portal;
pub mod render_target;
pub mod system;
