pub mod compliance;
pub mod suggestions;
