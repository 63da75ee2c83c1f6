pub mod archive;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod store;
pub mod validator;
