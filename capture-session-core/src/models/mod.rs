pub mod config;
pub mod device;
pub mod error;
pub mod route;
pub mod state;
