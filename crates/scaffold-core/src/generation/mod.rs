pub mod engine;
pub mod templates;
pub mod validator;
pub mod writer;
