use std::sync::Arc;

use school_core::repositories::EntityRepository;
use school_core::schema::Catalog;
use school_core::services::EntityService;
use school_security::JwtService;
use school_shared::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub entities: EntityService<dyn EntityRepository>,
    pub jwt: Arc<JwtService>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: Arc<dyn EntityRepository>, catalog: Arc<Catalog>, config: AppConfig) -> Self {
        Self {
            entities: EntityService::new(repo, catalog),
            jwt: Arc::new(JwtService::new(&config.jwt)),
            config,
        }
    }
}
