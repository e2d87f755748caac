use crate::config::Args;
use crate::geolocation::{GeoLookup, IpApiClient};
use crate::notifier::{Notifier, SendGridNotifier};
use crate::rate_limit::RateLimiter;
use crate::store::EntryStore;
use std::sync::Arc;
use std::time::Duration;

// app's shared state, built once in main and handed to the router
pub struct AppState {
    pub store: EntryStore,
    pub rate_limiter: RateLimiter,
    pub geo: Arc<dyn GeoLookup>,
    pub notifier: Arc<dyn Notifier>,
    pub geo_timeout: Duration, // how long notifications wait for geolocation
    pub config: Args,
}

impl AppState {
    // Production collaborators sharing one HTTP client
    pub fn new(config: Args, client: reqwest::Client) -> Self {
        let geo = Arc::new(IpApiClient::new(client.clone(), config.geo_url.clone()));
        let notifier = Arc::new(SendGridNotifier::new(
            client,
            config.sendgrid_url.clone(),
            config.notify_from.clone(),
            config.notify_to.clone(),
            config.site_name.clone(),
        ));
        Self::with_collaborators(config, geo, notifier)
    }

    pub fn with_collaborators(
        config: Args,
        geo: Arc<dyn GeoLookup>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store: EntryStore::new(),
            rate_limiter: RateLimiter::new(config.rate_limit, config.rate_window()),
            geo,
            notifier,
            geo_timeout: config.geo_timeout(),
            config,
        }
    }
}
