pub mod arena;
pub mod graphic;
pub mod handle;
pub mod layer;
pub mod page;
