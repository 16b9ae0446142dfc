use anyhow::{Context, Result, bail};
use std::env;
use zeroize::Zeroizing;

/// Used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 5500;

const LOCAL_PASS_SECRET: &str = "local-password-secret-change-me";
const LOCAL_JWT_SECRET: &str = "local-jwt-secret-change-me";

/// AppConfig
///
/// Holds the application's entire configuration. Loaded once at startup, never
/// mutated afterwards, and handed to the codec, the token service and the store
/// through `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls secret fallbacks and log format.
    pub env: Env,
    // TCP port the HTTP server binds to.
    pub port: u16,
    // PASS_SEC: key material for password encryption at rest.
    pub pass_secret: Zeroizing<String>,
    // JWT_SEC: key for signing and verifying session tokens.
    pub jwt_secret: Zeroizing<String>,
    // PostgreSQL connection string. When absent locally, the in-memory store is used.
    pub database_url: Option<String>,
    // Variables that were unset locally and replaced by a development fallback.
    pub fallbacks: Vec<&'static str>,
}

/// Env
///
/// Defines the runtime context.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// A configuration that never touches the environment, for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: DEFAULT_PORT,
            pass_secret: Zeroizing::new(LOCAL_PASS_SECRET.to_string()),
            jwt_secret: Zeroizing::new(LOCAL_JWT_SECRET.to_string()),
            database_url: None,
            fallbacks: Vec::new(),
        }
    }
}

/// Reads a secret; required in production, with a development fallback locally.
/// A fallback is recorded in `fallbacks` so it can be reported once logging is up.
fn secret(
    name: &'static str,
    env: &Env,
    fallback: &str,
    fallbacks: &mut Vec<&'static str>,
) -> Result<Zeroizing<String>> {
    match (env::var(name), env) {
        (Ok(value), _) if !value.is_empty() => Ok(Zeroizing::new(value)),
        (_, Env::Production) => bail!("{} must be set in production", name),
        (_, Env::Local) => {
            fallbacks.push(name);
            Ok(Zeroizing::new(fallback.to_string()))
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (`APP_ENV`, `PASS_SEC`,
    /// `JWT_SEC`, `PORT`, `DATABASE_URL`). Fails fast when production is missing a
    /// secret or a database, or when `PORT` is not a number.
    pub fn load() -> Result<Self> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let mut fallbacks = Vec::new();
        let pass_secret = secret("PASS_SEC", &env, LOCAL_PASS_SECRET, &mut fallbacks)?;
        let jwt_secret = secret("JWT_SEC", &env, LOCAL_JWT_SECRET, &mut fallbacks)?;

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a port number, got `{}`", raw))?,
            Err(_) => DEFAULT_PORT,
        };

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        if env == Env::Production && database_url.is_none() {
            bail!("DATABASE_URL must be set in production");
        }

        Ok(Self {
            env,
            port,
            pass_secret,
            jwt_secret,
            database_url,
            fallbacks,
        })
    }
}
