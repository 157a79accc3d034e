use std::path::Path;
use std::sync::Arc;

use crate::app::error::Result;
use crate::app::session::FeedSession;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;

pub struct AppContext {
    pub config: Config,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub session: FeedSession,
}

impl AppContext {
    /// Load configuration (from `config_path` or the default location) and
    /// wire an HTTP-backed session.
    pub fn new(config_path: Option<&Path>, base_url: Option<String>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        if let Some(base_url) = base_url {
            config.api.base_url = base_url;
        }

        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.api)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        let session = FeedSession::new(fetcher.clone(), config.feed.clone());
        Self {
            config,
            fetcher,
            session,
        }
    }
}
