pub mod assignments;
pub mod core;
pub mod curve;
pub mod scheme;
pub mod scores;
pub mod stats;
pub mod students;
