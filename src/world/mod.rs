pub mod area;
pub mod idmap;
pub mod map;
pub mod position;
pub mod state;
pub mod template;
pub mod tile;
pub mod time;
