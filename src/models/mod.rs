pub mod detection;
pub mod vehicle;
pub mod violation;
