mod component;
pub mod input_box;
pub mod usage;

pub use component::{Component, ComponentRender};
