pub mod item;
pub mod tree;
pub mod project;
pub mod config;

pub use item::*;
pub use tree::*;
pub use project::*;
pub use config::*;
