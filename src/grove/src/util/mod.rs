pub mod any;
pub mod hash;
