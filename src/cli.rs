//! Command Line Interface (CLI) arguments.

use crate::models::FieldSchema;

use clap::{Parser, ValueEnum};
use strum_macros::Display;
use url::Url;

/// How read requests are answered.
#[derive(Clone, Copy, Debug, Display, PartialEq, ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum QueryMode {
    /// Re-query the building store on every request
    Store,
    /// Load every building into memory once and answer from there
    Memory,
}

/// Footprints command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "FOOTPRINTS_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "FOOTPRINTS_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "FOOTPRINTS_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/footprints/certs/cert.pem",
        env = "FOOTPRINTS_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/footprints/certs/key.pem",
        env = "FOOTPRINTS_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "FOOTPRINTS_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "FOOTPRINTS_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Directory holding the building store
    #[arg(
        long,
        default_value = "~/.local/share/footprints/store",
        env = "FOOTPRINTS_STORE_PATH"
    )]
    pub store_path: String,
    /// URL of the open data endpoint used to populate an empty store
    #[arg(
        long,
        default_value = "https://data.cityofnewyork.us/resource/k8ez-gyqp.json",
        env = "FOOTPRINTS_SOURCE_URL"
    )]
    pub source_url: Url,
    /// Maximum number of records requested from the source. Uses the endpoint's default if unset.
    #[arg(long, env = "FOOTPRINTS_SOURCE_LIMIT")]
    pub source_limit: Option<usize>,
    /// Timeout in seconds for the source request
    #[arg(long, default_value_t = 60, env = "FOOTPRINTS_SOURCE_TIMEOUT")]
    pub source_timeout: u64,
    /// Whether to re-query the store per request or cache all buildings in memory
    #[arg(long, value_enum, default_value_t = QueryMode::Store, env = "FOOTPRINTS_QUERY_MODE")]
    pub query_mode: QueryMode,
    /// Whether year, height and area are rendered as strings or numbers
    #[arg(
        long,
        value_enum,
        default_value_t = FieldSchema::Numeric,
        env = "FOOTPRINTS_FIELD_SCHEMA"
    )]
    pub field_schema: FieldSchema,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
