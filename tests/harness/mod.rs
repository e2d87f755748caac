// Shared fixtures: an app wired to in-memory collaborators and request helpers.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use clap::Parser;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use waitlist_gateway::{
    AppState, Args,
    geolocation::{GeoLookup, Geolocation},
    models::BoxFuture,
    notifier::{Notifier, NotifyOutcome, SignupNotification},
    router,
};

// Geolocation that knows one fixed place for every public address.
pub struct FixedGeo;

impl GeoLookup for FixedGeo {
    fn lookup<'a>(&'a self, ip: &'a str) -> BoxFuture<'a, Option<Geolocation>> {
        Box::pin(async move {
            if waitlist_gateway::geolocation::should_skip(ip) {
                return None;
            }
            Some(Geolocation {
                city: Some("Guadalajara".to_string()),
                country: Some("Mexico".to_string()),
                ..Default::default()
            })
        })
    }
}

// Notifier that records every call and reports delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SignupNotification>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify<'a>(&'a self, signup: &'a SignupNotification) -> BoxFuture<'a, NotifyOutcome> {
        self.sent.lock().unwrap().push(signup.clone());
        Box::pin(async { NotifyOutcome::Delivered })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_args(&[])
    }

    pub fn with_args(extra: &[&str]) -> Self {
        let args = Args::parse_from(["waitlist-gateway"].iter().chain(extra.iter()).copied());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = Arc::new(AppState::with_collaborators(
            args,
            Arc::new(FixedGeo),
            notifier.clone(),
        ));
        Self {
            router: router(state.clone()),
            state,
            notifier,
        }
    }

    pub async fn post_raw(&self, body: &str, client: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method("POST")
            .uri("/waitlist")
            .header("content-type", "application/json");
        if let Some(ip) = client {
            req = req.header("x-forwarded-for", ip);
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn join(&self, email: &str, client: &str) -> (StatusCode, Value) {
        let body = serde_json::json!({ "email": email }).to_string();
        self.post_raw(&body, Some(client)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(req).await
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

// Let detached notification tasks run to completion.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
}
