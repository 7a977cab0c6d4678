pub mod bom;
pub mod calc;
pub mod item_ops;
pub mod lookup;
pub mod tracker;
pub mod transfer;
pub mod tree;
