pub mod block;
pub mod collision;
pub mod motion;
pub mod player;
pub mod rope;
pub mod tile;
