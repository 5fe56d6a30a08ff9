mod builder;
pub mod dates;
pub mod models;

pub use builder::*;
