pub mod account;
pub mod animations;
pub mod callbacks;
pub mod render;
pub mod share;
