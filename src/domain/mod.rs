pub mod entity;
pub mod geometry;
pub mod layer;
pub mod player;
pub mod pursuer;
pub mod rules;
pub mod tile;
