use std::sync::Arc;
use zania_rag::QueryService;

#[derive(Clone)]
pub struct AppState {
    pub query_service: Arc<QueryService>,
    pub timezone: String,
}

impl AppState {
    pub fn new(query_service: QueryService, timezone: impl Into<String>) -> Self {
        Self {
            query_service: Arc::new(query_service),
            timezone: timezone.into(),
        }
    }
}
