use anyhow::{Context, Result, bail, ensure};
use clap::{Parser, ValueEnum};
use std::{env, fmt, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used to build download links, without a trailing slash.
    pub public_url: String,
    /// Key prefix every managed object lives under. Empty or ending in `/`.
    pub folder: String,
    pub s3: S3Config,
    pub access: AccessConfig,
}

/// Connection settings for the S3-compatible backend.
#[derive(Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub force_path_style: bool,
    pub timeout: Duration,
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &"<redacted>")
            .field("secret_access_key", &"<redacted>")
            .field("force_path_style", &self.force_path_style)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Which admission policy the access gate enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccessPolicyKind {
    /// Every request is admitted.
    Open,
    /// Admit only clients whose address starts with an allowed prefix.
    Prefix,
    /// Admit by address prefix, or by reverse DNS name under the allowed domain.
    PrefixOrDomain,
}

#[derive(Debug, Clone)]
pub struct AccessConfig {
    pub policy: AccessPolicyKind,
    pub allowed_prefixes: Vec<String>,
    pub allowed_domain: Option<String>,
    pub dns_timeout: Duration,
    pub dns_cache_ttl: Duration,
    pub dns_cache_capacity: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "HTTP gateway for a folder in an S3-compatible bucket")]
pub struct Args {
    /// Host to bind to (overrides GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// S3 endpoint URL (overrides GATEWAY_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Account id used to derive an R2 endpoint (overrides GATEWAY_ACCOUNT_ID)
    #[arg(long)]
    pub account_id: Option<String>,

    /// Signing region (overrides GATEWAY_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Use path-style bucket addressing (overrides GATEWAY_S3_PATH_STYLE)
    #[arg(long)]
    pub s3_path_style: Option<bool>,

    /// Backend operation timeout in milliseconds (overrides GATEWAY_S3_TIMEOUT_MS)
    #[arg(long)]
    pub s3_timeout_ms: Option<u64>,

    /// Bucket name (overrides GATEWAY_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Public base URL for download links (overrides GATEWAY_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Folder prefix inside the bucket (overrides GATEWAY_FOLDER)
    #[arg(long)]
    pub folder: Option<String>,

    /// Access policy (overrides GATEWAY_ACCESS_POLICY)
    #[arg(long, value_enum)]
    pub access_policy: Option<AccessPolicyKind>,

    /// Allowed client address prefix, repeatable (overrides GATEWAY_ALLOWED_PREFIXES)
    #[arg(long = "allowed-prefix")]
    pub allowed_prefixes: Vec<String>,

    /// Allowed reverse DNS domain suffix (overrides GATEWAY_ALLOWED_DOMAIN)
    #[arg(long)]
    pub allowed_domain: Option<String>,

    /// Reverse DNS timeout in milliseconds (overrides GATEWAY_DNS_TIMEOUT_MS)
    #[arg(long)]
    pub dns_timeout_ms: Option<u64>,

    /// Reverse DNS cache TTL in seconds (overrides GATEWAY_DNS_CACHE_TTL_SECS)
    #[arg(long)]
    pub dns_cache_ttl_secs: Option<u64>,

    /// Maximum cached reverse DNS entries (overrides GATEWAY_DNS_CACHE_CAPACITY)
    #[arg(long)]
    pub dns_cache_capacity: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::resolve(args, |name| env::var(name).ok())
    }

    /// Merge parsed CLI args over values looked up by env var name.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = args
            .host
            .or_else(|| lookup("GATEWAY_HOST"))
            .unwrap_or_else(|| "0.0.0.0".into());
        let port = match args.port {
            Some(port) => port,
            None => parse_var(&lookup, "GATEWAY_PORT", 5000)?,
        };

        let endpoint = match args.s3_endpoint.or_else(|| lookup("GATEWAY_S3_ENDPOINT")) {
            Some(endpoint) => endpoint,
            None => match args.account_id.or_else(|| lookup("GATEWAY_ACCOUNT_ID")) {
                Some(account) if !account.trim().is_empty() => {
                    format!("https://{}.r2.cloudflarestorage.com", account.trim())
                }
                _ => bail!("either GATEWAY_S3_ENDPOINT or GATEWAY_ACCOUNT_ID must be set"),
            },
        };
        let region = args
            .s3_region
            .or_else(|| lookup("GATEWAY_S3_REGION"))
            .unwrap_or_else(|| "auto".into());
        let force_path_style = match args.s3_path_style {
            Some(value) => value,
            None => parse_var(&lookup, "GATEWAY_S3_PATH_STYLE", true)?,
        };
        let timeout_ms = match args.s3_timeout_ms {
            Some(value) => value,
            None => parse_var(&lookup, "GATEWAY_S3_TIMEOUT_MS", 30_000)?,
        };
        ensure!(timeout_ms > 0, "backend timeout must be greater than zero");

        let s3 = S3Config {
            endpoint,
            region,
            bucket: required(args.bucket.or_else(|| lookup("GATEWAY_BUCKET")), "GATEWAY_BUCKET")?,
            access_key_id: required(lookup("GATEWAY_ACCESS_KEY_ID"), "GATEWAY_ACCESS_KEY_ID")?,
            secret_access_key: required(
                lookup("GATEWAY_SECRET_ACCESS_KEY"),
                "GATEWAY_SECRET_ACCESS_KEY",
            )?,
            force_path_style,
            timeout: Duration::from_millis(timeout_ms),
        };

        let public_url = required(
            args.public_url.or_else(|| lookup("GATEWAY_PUBLIC_URL")),
            "GATEWAY_PUBLIC_URL",
        )?
        .trim_end_matches('/')
        .to_string();
        let folder = normalize_folder(
            &args
                .folder
                .or_else(|| lookup("GATEWAY_FOLDER"))
                .unwrap_or_else(|| "imagens/".into()),
        )?;

        let access = resolve_access(
            AccessArgs {
                policy: args.access_policy,
                prefixes: args.allowed_prefixes,
                domain: args.allowed_domain,
                dns_timeout_ms: args.dns_timeout_ms,
                cache_ttl_secs: args.dns_cache_ttl_secs,
                cache_capacity: args.dns_cache_capacity,
            },
            &lookup,
        )?;

        Ok(Self {
            host,
            port,
            public_url,
            folder,
            s3,
            access,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct AccessArgs {
    policy: Option<AccessPolicyKind>,
    prefixes: Vec<String>,
    domain: Option<String>,
    dns_timeout_ms: Option<u64>,
    cache_ttl_secs: Option<u64>,
    cache_capacity: Option<usize>,
}

fn resolve_access<F>(args: AccessArgs, lookup: &F) -> Result<AccessConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let policy = match args.policy {
        Some(policy) => policy,
        None => match lookup("GATEWAY_ACCESS_POLICY") {
            Some(value) => <AccessPolicyKind as ValueEnum>::from_str(value.trim(), true)
                .map_err(|err| anyhow::anyhow!(err))
                .with_context(|| format!("parsing GATEWAY_ACCESS_POLICY value `{}`", value))?,
            None => AccessPolicyKind::Open,
        },
    };

    let mut allowed_prefixes = if args.prefixes.is_empty() {
        lookup("GATEWAY_ALLOWED_PREFIXES")
            .map(|raw| raw.split(',').map(str::to_string).collect())
            .unwrap_or_else(|| vec!["192.168.".to_string()])
    } else {
        args.prefixes
    };
    allowed_prefixes = allowed_prefixes
        .into_iter()
        .map(|prefix| prefix.trim().to_string())
        .filter(|prefix| !prefix.is_empty())
        .collect();

    let allowed_domain = args
        .domain
        .or_else(|| lookup("GATEWAY_ALLOWED_DOMAIN"))
        .map(|domain| domain.trim().trim_matches('.').to_ascii_lowercase())
        .filter(|domain| !domain.is_empty());

    if policy == AccessPolicyKind::Prefix {
        ensure!(
            !allowed_prefixes.is_empty(),
            "the prefix access policy needs at least one allowed prefix"
        );
    }
    if policy == AccessPolicyKind::PrefixOrDomain {
        ensure!(
            allowed_domain.is_some(),
            "the prefix-or-domain access policy requires GATEWAY_ALLOWED_DOMAIN"
        );
    }

    let dns_timeout_ms = match args.dns_timeout_ms {
        Some(value) => value,
        None => parse_var(lookup, "GATEWAY_DNS_TIMEOUT_MS", 500)?,
    };
    let cache_ttl_secs = match args.cache_ttl_secs {
        Some(value) => value,
        None => parse_var(lookup, "GATEWAY_DNS_CACHE_TTL_SECS", 60)?,
    };
    let dns_cache_capacity = match args.cache_capacity {
        Some(value) => value,
        None => parse_var(lookup, "GATEWAY_DNS_CACHE_CAPACITY", 1024)?,
    };
    ensure!(dns_timeout_ms > 0, "DNS timeout must be greater than zero");
    ensure!(dns_cache_capacity > 0, "DNS cache capacity must be greater than zero");

    Ok(AccessConfig {
        policy,
        allowed_prefixes,
        allowed_domain,
        dns_timeout: Duration::from_millis(dns_timeout_ms),
        dns_cache_ttl: Duration::from_secs(cache_ttl_secs),
        dns_cache_capacity,
    })
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => bail!("{} must be set", name),
    }
}

/// Normalize the folder prefix to `segment/segment/` form.
///
/// An empty folder means the bucket root. Dot segments are rejected so the
/// prefix can never point outside what the operator configured.
pub fn normalize_folder(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    let segments: Vec<&str> = trimmed
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.iter().any(|s| *s == "." || *s == "..") {
        bail!("folder `{}` must not contain `.` or `..` segments", raw);
    }
    Ok(format!("{}/", segments.join("/")))
}
