pub mod admin;
pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod resumes;
pub mod state;
pub mod store;
