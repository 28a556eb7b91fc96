pub mod core;
pub mod seed;
