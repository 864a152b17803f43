pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod serde_utils;
pub mod storage;
pub mod tracking;
pub mod wiki;
