use crate::geolocation::{GeoLookup, Geolocation};
use crate::metrics::{GEOLOCATION_OUTCOMES, NOTIFICATION_OUTCOMES};
use crate::models::WaitlistEntry;
use crate::notifier::{Notifier, NotifyOutcome, SignupNotification};
use crate::rate_limit::UNKNOWN_CLIENT;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

// Launch the geolocation + notification continuation for a stored entry.
// The response does not wait for it; the handle is only useful to tests.
pub fn spawn_notification(
    entry: &WaitlistEntry,
    client_ip: &str,
    geo: Arc<dyn GeoLookup>,
    notifier: Arc<dyn Notifier>,
    geo_timeout: Duration,
) -> JoinHandle<NotifyOutcome> {
    let signup = SignupNotification {
        email: entry.email.clone(),
        timestamp: entry.timestamp.clone(),
        ip_address: (client_ip != UNKNOWN_CLIENT).then(|| client_ip.to_string()),
        geolocation: None,
    };
    let ip = client_ip.to_string();

    tokio::spawn(async move { notify_signup(signup, ip, geo, notifier, geo_timeout).await })
}

// Geolocate (bounded by geo_timeout) then notify. The notifier runs exactly once.
pub async fn notify_signup(
    mut signup: SignupNotification,
    ip: String,
    geo: Arc<dyn GeoLookup>,
    notifier: Arc<dyn Notifier>,
    geo_timeout: Duration,
) -> NotifyOutcome {
    info!(email = %signup.email, %ip, "Triggering signup notification");

    signup.geolocation = lookup_with_deadline(geo, ip, geo_timeout).await;

    let outcome = notifier.notify(&signup).await;
    NOTIFICATION_OUTCOMES.with_label_values(&[outcome.kind()]).inc();

    if outcome.is_delivered() {
        info!(email = %signup.email, "Signup notification sent");
    } else {
        error!(email = %signup.email, %outcome, "Signup notification failed");
    }
    outcome
}

// Race the lookup against the deadline. The lookup runs in its own task so a
// lost race leaves it running; its late result is dropped with the handle.
async fn lookup_with_deadline(
    geo: Arc<dyn GeoLookup>,
    ip: String,
    deadline: Duration,
) -> Option<Geolocation> {
    let lookup = tokio::spawn(async move { geo.lookup(&ip).await });

    let label = match tokio::time::timeout(deadline, lookup).await {
        Ok(Ok(Some(geo))) => {
            GEOLOCATION_OUTCOMES.with_label_values(&["found"]).inc();
            return Some(geo);
        }
        Ok(Ok(None)) => "empty",
        Ok(Err(e)) => {
            error!(error = %e, "Geolocation task failed, notifying without location");
            "failed"
        }
        Err(_) => {
            warn!(?deadline, "Geolocation lookup timed out, notifying without location");
            "timeout"
        }
    };
    GEOLOCATION_OUTCOMES.with_label_values(&[label]).inc();
    None
}
