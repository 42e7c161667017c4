// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    services::{
        auth::AuthService, exam::ExamService, mailer::Mailer, topic::TopicService,
        uploads::ImageStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub auth: AuthService,
    pub exams: ExamService,
    pub topics: TopicService,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            auth: AuthService::new(pool.clone(), config.clone(), mailer),
            exams: ExamService::new(pool.clone(), config.clone()),
            topics: TopicService::new(pool.clone(), config.clone()),
            images: ImageStore::new(&config.upload_dir),
            pool,
            config,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
