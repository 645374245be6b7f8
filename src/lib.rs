pub mod config;
pub mod crypto;
pub mod keystore;
pub mod policy;
pub mod serializer;
pub mod transaction;
