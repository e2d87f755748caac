use clap::Parser;
use std::time::Duration;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "waitlist-gateway")]
#[command(about = "Email waitlist signup service with rate limiting and signup notifications")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT", default_value_t = 3)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // How often expired rate limit records are swept, in seconds
    #[arg(long, env = "CLEANUP_INTERVAL", default_value_t = 60)]
    pub cleanup_interval: u64,

    // Deadline for the geolocation lookup before notifying without it
    #[arg(long, env = "GEO_TIMEOUT_MS", default_value_t = 2000)]
    pub geo_timeout_ms: u64,

    // Geolocation service base url
    #[arg(long, env = "GEO_URL", default_value = "https://ipapi.co")]
    pub geo_url: String,

    // SendGrid API base url
    #[arg(long, env = "SENDGRID_URL", default_value = "https://api.sendgrid.com")]
    pub sendgrid_url: String,

    // Verified sender address for notifications
    #[arg(long, env = "NOTIFY_FROM", default_value = "trevor@vangalder.com")]
    pub notify_from: String,

    // Where signup notifications are delivered
    #[arg(long, env = "NOTIFY_TO", default_value = "trevor@vangalder.com")]
    pub notify_to: String,

    // Site name used in notification subjects and service metadata
    #[arg(long, env = "SITE_NAME", default_value = "angel.rent")]
    pub site_name: String,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn geo_timeout(&self) -> Duration {
        Duration::from_millis(self.geo_timeout_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}
