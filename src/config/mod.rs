//! Configuration: runtime settings, command line and credentials.
//!
//! - [`Config`]: knobs of the ingestion runtime with documented defaults;
//! - [`Args`]: `clap` flags with `GEOINGEST_*` environment fallbacks;
//! - [`Credentials`]: upstream bearer token from the environment or a key file.

mod args;
mod credentials;
mod settings;

pub use args::{parse_duration, Args, BackendKind, LogFormat, OnPublishError};
pub use credentials::{Credentials, BEARER_TOKEN_ENV};
pub use settings::Config;
