//! Connection configuration for the SurrealDB backend.

/// Default namespace selected after connecting.
pub const DEFAULT_NAMESPACE: &str = "remedies";
/// Default database selected after connecting.
pub const DEFAULT_DATABASE: &str = "main";
/// Local persistence directory used when nothing else is configured.
pub const DEFAULT_LOCAL_PATH: &str = ".remedies/db";

/// Configuration for an authenticated (cloud or self-hosted) SurrealDB
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint URL (e.g., "wss://xxx.aws-use1.surrealdb.cloud")
    pub endpoint: String,
    /// Database username
    pub username: String,
    /// Database password
    pub password: String,
    /// Namespace (default: "remedies")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl CloudConfig {
    /// Create a new configuration for a database user
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            is_root: false,
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Set whether this is a root user
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - SURREALDB_ENDPOINT (required)
    /// - SURREALDB_USERNAME (required)
    /// - SURREALDB_PASSWORD (required)
    /// - SURREALDB_NAMESPACE (optional, default: "remedies")
    /// - SURREALDB_DATABASE (optional, default: "main")
    /// - SURREALDB_ROOT (optional, default: "false")
    pub fn from_env() -> std::result::Result<Self, String> {
        let endpoint =
            std::env::var("SURREALDB_ENDPOINT").map_err(|_| "SURREALDB_ENDPOINT not set")?;
        let username =
            std::env::var("SURREALDB_USERNAME").map_err(|_| "SURREALDB_USERNAME not set")?;
        let password =
            std::env::var("SURREALDB_PASSWORD").map_err(|_| "SURREALDB_PASSWORD not set")?;
        let namespace = std::env::var("SURREALDB_NAMESPACE")
            .unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());
        let database = std::env::var("SURREALDB_DATABASE")
            .unwrap_or_else(|_| DEFAULT_DATABASE.to_string());
        let is_root = std::env::var("SURREALDB_ROOT")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Self {
            endpoint,
            username,
            password,
            namespace,
            database,
            is_root,
        })
    }
}

/// Where the store should connect.
#[derive(Debug, Clone)]
pub enum StoreTarget {
    /// Ephemeral `mem://` database
    InMemory,
    /// Unauthenticated URL (`surrealkv://path`, `ws://host:port`, …)
    Url(String),
    /// Authenticated endpoint
    Cloud(CloudConfig),
}

impl StoreTarget {
    /// Resolve the target from the environment.
    ///
    /// Cloud credentials win, then `SURREALDB_URL`, then local persistence
    /// under `.remedies/db`.
    pub fn from_env() -> Self {
        if let Ok(config) = CloudConfig::from_env() {
            return StoreTarget::Cloud(config);
        }
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            return StoreTarget::Url(url);
        }
        StoreTarget::Url(format!("surrealkv://{DEFAULT_LOCAL_PATH}"))
    }
}
