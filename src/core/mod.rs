pub mod backend;
pub mod config;
pub mod conversation;
pub mod message;
pub mod persona;
pub mod session;
