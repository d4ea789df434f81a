pub mod auth;
pub mod error;
pub mod maintenance;
pub mod records;
pub mod schema;
pub mod storage;
pub mod token;
