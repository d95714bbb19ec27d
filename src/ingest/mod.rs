pub mod error;
pub mod runner;
pub mod store;
pub mod validator;
