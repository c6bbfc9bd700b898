pub mod fields;
pub mod names;
pub mod tags;
