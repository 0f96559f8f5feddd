use postgres::database::DEFAULT_DATABASE_URL;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PUBLIC_DIR: &str = "./public";
const DEVELOPMENT_JWT_SECRET: &str = "yelpcamp-development-secret";

/// Server settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Postgres connection string
    pub database_url: String,
    /// Interface to listen on
    pub bind_address: String,
    /// Port to listen on
    pub port: u16,
    /// Secret signing session tokens
    pub jwt_secret: String,
    /// Google Geocoding API key
    pub geocoder_api_key: Option<String>,
    /// Directory served under `/public`
    pub public_dir: String,
}

impl ServerConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match read("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
                log::warn!("⚠️ Invalid PORT {:?} ({}), using {}", raw, e, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let jwt_secret = read("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("⚠️ JWT_SECRET not set, using the development secret");
            DEVELOPMENT_JWT_SECRET.to_string()
        });

        Self {
            database_url: read("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_address: read("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port,
            jwt_secret,
            geocoder_api_key: read("GEOCODER_API_KEY"),
            public_dir: read("PUBLIC_DIR").unwrap_or_else(|| DEFAULT_PUBLIC_DIR.to_string()),
        }
    }
}
