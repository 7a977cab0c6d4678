pub mod natural;
pub mod unicode;

pub use natural::natural_cmp;
