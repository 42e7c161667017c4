// src/services/mod.rs
//
// Workflows called by the handlers. Each service owns the handles it needs
// and is constructed once at startup.

pub mod auth;
pub mod exam;
pub mod grading;
pub mod mailer;
pub mod question_set;
pub mod topic;
pub mod uploads;
