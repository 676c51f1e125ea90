use crate::services::gallery_service::CaptionPolicy;
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, fmt, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub public_base_url: String,
    pub admin_identifier: String,
    pub admin_secret: String,
    pub caption_policy: CaptionPolicy,
    pub max_upload_bytes: usize,
    pub orders_email: String,
    pub session_ttl_secs: u64,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage_dir", &self.storage_dir)
            .field("database_url", &self.database_url)
            .field("public_base_url", &self.public_base_url)
            .field("admin_identifier", &self.admin_identifier)
            .field("admin_secret", &"<redacted>")
            .field("caption_policy", &self.caption_policy)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("orders_email", &self.orders_email)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Gallery admin and order desk for a millinery site")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GALLERY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where gallery images are stored (overrides GALLERY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides GALLERY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Origin used when issuing image URLs (overrides GALLERY_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Admin login identifier (overrides GALLERY_ADMIN_IDENTIFIER)
    #[arg(long)]
    pub admin_identifier: Option<String>,

    /// Caption used for files uploaded without one (overrides GALLERY_CAPTION_POLICY)
    #[arg(long, value_enum)]
    pub caption_policy: Option<CaptionPolicy>,

    /// Largest accepted upload request in bytes (overrides GALLERY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Address order requests are drafted to (overrides GALLERY_ORDERS_EMAIL)
    #[arg(long)]
    pub orders_email: Option<String>,

    /// Seconds a sign-in stays valid (overrides GALLERY_SESSION_TTL_SECS)
    #[arg(long)]
    pub session_ttl_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    ///
    /// The admin secret is only read from `GALLERY_ADMIN_SECRET` so it never
    /// shows up in a process listing.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("GALLERY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("GALLERY_PORT", 3000u16)?;
        let env_storage =
            env::var("GALLERY_STORAGE_DIR").unwrap_or_else(|_| "./data/blobs".into());
        let env_db = env::var("GALLERY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/gallery.db".into());
        let env_identifier = env::var("GALLERY_ADMIN_IDENTIFIER").ok();
        let env_caption = match env::var("GALLERY_CAPTION_POLICY") {
            Ok(value) => <CaptionPolicy as ValueEnum>::from_str(&value, true).map_err(anyhow::Error::msg)?,
            Err(_) => CaptionPolicy::default(),
        };
        let env_max_upload = parse_env("GALLERY_MAX_UPLOAD_BYTES", 64 * 1024 * 1024usize)?;
        let env_orders =
            env::var("GALLERY_ORDERS_EMAIL").unwrap_or_else(|_| "orders@example.com".into());

        let env_session_ttl = parse_env("GALLERY_SESSION_TTL_SECS", 12 * 60 * 60u64)?;

        let admin_secret = match env::var("GALLERY_ADMIN_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => bail!("GALLERY_ADMIN_SECRET must be set"),
        };
        let Some(admin_identifier) = args.admin_identifier.or(env_identifier) else {
            bail!("an admin identifier is required (--admin-identifier or GALLERY_ADMIN_IDENTIFIER)");
        };

        // --- Merge ---
        let port = args.port.unwrap_or(env_port);
        let public_base_url = args
            .public_base_url
            .or_else(|| env::var("GALLERY_PUBLIC_BASE_URL").ok())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port,
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            public_base_url,
            admin_identifier,
            admin_secret,
            caption_policy: args.caption_policy.unwrap_or(env_caption),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            orders_email: args.orders_email.unwrap_or(env_orders),
            session_ttl_secs: args.session_ttl_secs.unwrap_or(env_session_ttl),
        };
        if cfg.session_ttl_secs == 0 {
            bail!("the session TTL must be at least one second");
        }

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Read and parse an optional numeric environment variable.
fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
