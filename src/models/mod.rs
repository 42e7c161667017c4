// src/models/mod.rs

use serde::Serialize;

pub mod attempt;
pub mod progress;
pub mod question;
pub mod token;
pub mod topic;
pub mod user;

/// Success envelope shared by every JSON handler: `{"success": true, ...payload}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
