pub mod filesystem;
pub mod imports;
pub mod parser;
pub mod patterns;
pub mod syntax;
