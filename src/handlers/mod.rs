// src/handlers/mod.rs

pub mod auth;
pub mod exam;
pub mod questions;
pub mod topics;
pub mod users;
