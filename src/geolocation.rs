// Best-effort reverse IP geolocation.
//
// Lookups never fail from the caller's point of view: every error is logged
// here and reported as "no data". Callers are responsible for bounding how
// long they wait.

use crate::models::BoxFuture;
use crate::rate_limit::UNKNOWN_CLIENT;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("waitlist-gateway/", env!("CARGO_PKG_VERSION"));

// Location details for an IP. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub timezone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Geolocation {
    // "City, Region, Country" from whichever parts are known.
    pub fn place(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.city, &self.region, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

pub trait GeoLookup: Send + Sync {
    // Resolve `ip` to a location. `None` covers both "nothing known" and
    // any failure along the way.
    fn lookup<'a>(&'a self, ip: &'a str) -> BoxFuture<'a, Option<Geolocation>>;
}

// Whether `ip` should never be sent to the geolocation service.
pub fn should_skip(ip: &str) -> bool {
    if ip.is_empty() || ip == UNKNOWN_CLIENT {
        return true;
    }

    match ip.parse::<IpAddr>() {
        Ok(addr) => !is_public(addr),
        Err(_) => true,
    }
}

fn is_public(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_public(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}

// ipapi.co response body. Errors come back as {"error": true, "reason": ...}
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    country_code: Option<String>,
    timezone: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl IpApiResponse {
    fn into_geolocation(self) -> Option<Geolocation> {
        if self.error {
            warn!(reason = ?self.reason, "Geolocation API returned an error");
            return None;
        }

        Some(Geolocation {
            city: non_empty(self.city),
            region: non_empty(self.region),
            country: non_empty(self.country_name),
            country_code: non_empty(self.country_code),
            timezone: non_empty(self.timezone),
            latitude: self.latitude.filter(|v| *v != 0.0),
            longitude: self.longitude.filter(|v| *v != 0.0),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// Client for the ipapi.co JSON API.
pub struct IpApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl IpApiClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, ip: &str) -> Option<Geolocation> {
        if should_skip(ip) {
            debug!(%ip, "Skipping geolocation lookup");
            return None;
        }

        let url = format!("{}/{}/json/", self.base_url, ip);
        debug!(%ip, %url, "Looking up IP");

        let res = match self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                warn!(%ip, error = %e, "Geolocation request failed");
                return None;
            }
        };

        if !res.status().is_success() {
            warn!(%ip, status = %res.status(), "Geolocation lookup failed");
            return None;
        }

        match res.json::<IpApiResponse>().await {
            Ok(body) => {
                let geo = body.into_geolocation()?;
                info!(%ip, place = ?geo.place(), "Geolocation lookup successful");
                Some(geo)
            }
            Err(e) => {
                warn!(%ip, error = %e, "Malformed geolocation response");
                None
            }
        }
    }
}

impl GeoLookup for IpApiClient {
    fn lookup<'a>(&'a self, ip: &'a str) -> BoxFuture<'a, Option<Geolocation>> {
        Box::pin(self.fetch(ip))
    }
}
