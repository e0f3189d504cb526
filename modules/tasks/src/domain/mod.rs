pub mod error;
pub mod repo;
pub mod service;
pub mod translate;
pub mod validation;
