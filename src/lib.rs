pub mod api;
pub mod chat;
pub mod common;
pub mod config;
pub mod presence;
pub mod storage;
pub mod visibility;
