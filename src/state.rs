use crate::dispatch::Dispatcher;
use crate::pages::api_loaders;
use crate::session::Session;
use crate::source::DataSource;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn DataSource>,
    pub dispatcher: Dispatcher,
    pub session: Arc<Mutex<Option<Session>>>,
}

impl AppState {
    pub fn new(source: Arc<dyn DataSource>, trend_weeks: u32) -> Self {
        Self {
            dispatcher: Dispatcher::new(api_loaders(source.clone(), trend_weeks)),
            source,
            session: Arc::new(Mutex::new(None)),
        }
    }
}
