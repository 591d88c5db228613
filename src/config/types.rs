use serde::Deserialize;

/// Main configuration structure for Mirrorator
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub aliases: AliasConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Where packages are mirrored from and how their listings are filtered
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream repository (listings live under `/simple/`)
    pub host: String,

    /// Path prefix that marks an href as pointing into package storage
    #[serde(rename = "package-prefix")]
    pub package_prefix: String,

    /// Path segment every mirrored archive link must contain
    #[serde(rename = "source-marker")]
    pub source_marker: String,

    /// Substring marking a pre-release build; matching links are skipped
    #[serde(rename = "prerelease-marker")]
    pub prerelease_marker: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: "http://b.pypi.python.org".to_string(),
            package_prefix: "../../packages/".to_string(),
            source_marker: "/source/".to_string(),
            prerelease_marker: "-alpha-".to_string(),
        }
    }
}

/// Local mirror layout and input/output files
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Root directory of the mirror tree
    pub root: String,

    /// Newline-delimited list of seed package names
    #[serde(rename = "packages-file")]
    pub packages_file: String,

    /// Path of the requirement-tree report
    #[serde(rename = "report-path")]
    pub report_path: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            root: "./root".to_string(),
            packages_file: "packages.txt".to_string(),
            report_path: "requirement-tree.txt".to_string(),
        }
    }
}

/// Package alias index caching
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    /// Local copy of the full upstream package name listing
    #[serde(rename = "index-path")]
    pub index_path: String,

    /// Age after which the local copy is downloaded again (hours)
    #[serde(rename = "max-age-hours")]
    pub max_age_hours: u64,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            index_path: "package-index.txt".to_string(),
            max_age_hours: 84,
        }
    }
}

/// HTTP client behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Timeout for a single request (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Timeout for establishing a connection (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Budget for all network calls made on behalf of one package (seconds)
    #[serde(rename = "package-deadline-secs")]
    pub package_deadline_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("mirrorator/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 300,
            connect_timeout_secs: 10,
            package_deadline_secs: 1800,
        }
    }
}
