pub mod receipt;
pub mod user;
