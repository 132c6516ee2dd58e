pub mod receipt;
pub mod request;
pub mod route;
pub mod user;
