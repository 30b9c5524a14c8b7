//! # Command line and environment.
//!
//! Every flag has a `GEOINGEST_*` environment fallback; a `.env` file in the
//! working directory is loaded by the binary before parsing.
//!
//! Durations accept `500ms`, `30s`, `5m`, `1h` or a bare number of seconds.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use super::{Config, Credentials};
use crate::{
    error::ConfigError,
    policies::{BackoffPolicy, PublishFailurePolicy, RestartPolicy, StallPolicy},
    publish::{Backend, KafkaSettings, Outbound, PartitionKey, PayloadFormat},
};

/// Publisher backend names accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Kafka topic (`kafka` feature).
    Kafka,
    /// Redis stream named after the topic (`redis` feature).
    Redis,
    /// One payload per line on stdout.
    Stdout,
    /// Keep records in memory (dry run).
    Memory,
}

/// Reaction to a failed publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OnPublishError {
    /// Drop and count.
    Drop,
    /// Retry `--publish-retries` times, then drop and count.
    Retry,
    /// Fail the worker attempt.
    Escalate,
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Command-line arguments of the `geoingest` binary.
#[derive(Parser, Debug)]
#[command(
    name = "geoingest",
    version,
    about = "Ingests geotagged posts per region and republishes them to a message bus"
)]
pub struct Args {
    /// JSON file listing the regions to subscribe to.
    #[arg(long, env = "GEOINGEST_REGIONS", default_value = "locations.json")]
    pub regions: PathBuf,

    /// Upstream filter-stream endpoint.
    #[arg(
        long,
        env = "GEOINGEST_UPSTREAM_URL",
        default_value = "https://stream.twitter.com/1.1/statuses/filter.json"
    )]
    pub upstream_url: String,

    /// Bearer token for the upstream.
    #[arg(long, env = "GEOINGEST_BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// JSON key file with a `bearerToken` field, used when no token is given.
    #[arg(long, env = "GEOINGEST_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Connect timeout for each subscription request.
    #[arg(long, env = "GEOINGEST_CONNECT_TIMEOUT", default_value = "10s", value_parser = parse_duration)]
    pub connect_timeout: Duration,

    /// Destination topic (Kafka topic or Redis stream key).
    #[arg(long, env = "GEOINGEST_TOPIC", default_value = "raw-tweets")]
    pub topic: String,

    /// Publisher backend.
    #[arg(long, env = "GEOINGEST_PUBLISHER", value_enum, default_value_t = BackendKind::Redis)]
    pub publisher: BackendKind,

    /// Kafka bootstrap servers.
    #[arg(long, env = "GEOINGEST_KAFKA_BROKERS", default_value = "localhost:9092")]
    pub kafka_brokers: String,

    /// Kafka SASL/PLAIN username.
    #[arg(long, env = "GEOINGEST_KAFKA_USERNAME")]
    pub kafka_username: Option<String>,

    /// Kafka SASL/PLAIN password.
    #[arg(long, env = "GEOINGEST_KAFKA_PASSWORD", hide_env_values = true)]
    pub kafka_password: Option<String>,

    /// Connect to Kafka over TLS.
    #[arg(long, env = "GEOINGEST_KAFKA_TLS")]
    pub kafka_tls: bool,

    /// Redis connection URL.
    #[arg(long, env = "GEOINGEST_REDIS_URL", default_value = "redis://127.0.0.1/")]
    pub redis_url: String,

    /// Approximate length cap of the Redis stream.
    #[arg(long, env = "GEOINGEST_REDIS_MAXLEN")]
    pub redis_max_len: Option<usize>,

    /// Partition key policy: `region` or `fixed:<key>`.
    #[arg(long, env = "GEOINGEST_PARTITION_KEY", default_value = "region")]
    pub partition_key: PartitionKey,

    /// Payload format: `raw` or `envelope`.
    #[arg(long, env = "GEOINGEST_PAYLOAD", default_value = "envelope")]
    pub payload: PayloadFormat,

    /// Pause between consecutive worker launches.
    #[arg(long, env = "GEOINGEST_LAUNCH_INTERVAL", default_value = "30s", value_parser = parse_duration)]
    pub launch_interval: Duration,

    /// Period of the liveness check.
    #[arg(long, env = "GEOINGEST_SUPERVISE_INTERVAL", default_value = "30s", value_parser = parse_duration)]
    pub supervise_interval: Duration,

    /// Stall policy: `alert` or `restart:<n>`.
    #[arg(long, env = "GEOINGEST_STALL_POLICY", default_value = "restart:2")]
    pub stall_policy: StallPolicy,

    /// Consecutive failed attempts before a region is given up (unbounded when unset).
    #[arg(long, env = "GEOINGEST_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// First resubscribe delay.
    #[arg(long, env = "GEOINGEST_BACKOFF_FIRST", default_value = "1s", value_parser = parse_duration)]
    pub backoff_first: Duration,

    /// Resubscribe delay cap.
    #[arg(long, env = "GEOINGEST_BACKOFF_MAX", default_value = "5m", value_parser = parse_duration)]
    pub backoff_max: Duration,

    /// Reaction to a failed publish.
    #[arg(long, env = "GEOINGEST_ON_PUBLISH_ERROR", value_enum, default_value_t = OnPublishError::Retry)]
    pub on_publish_error: OnPublishError,

    /// Extra publish attempts under `--on-publish-error retry`.
    #[arg(long, env = "GEOINGEST_PUBLISH_RETRIES", default_value_t = 3)]
    pub publish_retries: u32,

    /// Maximum wait for workers after a termination signal.
    #[arg(long, env = "GEOINGEST_GRACE", default_value = "30s", value_parser = parse_duration)]
    pub grace: Duration,

    /// Event bus capacity.
    #[arg(long, env = "GEOINGEST_BUS_CAPACITY", default_value_t = 1024)]
    pub bus_capacity: usize,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "GEOINGEST_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, env = "GEOINGEST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// Runtime settings derived from the flags.
    pub fn config(&self) -> Result<Config, ConfigError> {
        let defaults = Config::default();

        let publish_failure = match self.on_publish_error {
            OnPublishError::Drop => PublishFailurePolicy::Drop,
            OnPublishError::Escalate => PublishFailurePolicy::Escalate,
            OnPublishError::Retry => match PublishFailurePolicy::default() {
                PublishFailurePolicy::Retry { backoff, .. } => PublishFailurePolicy::Retry {
                    attempts: self.publish_retries,
                    backoff,
                },
                other => other,
            },
        };

        let cfg = Config {
            launch_interval: self.launch_interval,
            supervise_interval: self.supervise_interval,
            grace: self.grace,
            bus_capacity: self.bus_capacity,
            restart: RestartPolicy::OnFailure {
                max_retries: self.max_retries,
            },
            backoff: BackoffPolicy {
                first: self.backoff_first,
                max: self.backoff_max,
                ..BackoffPolicy::default()
            },
            stall: self.stall_policy,
            publish_failure,
            outbound: Outbound {
                topic: Arc::from(self.topic.trim()),
                key: self.partition_key.clone(),
                format: self.payload,
            },
            ..defaults
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Publisher backend selected by the flags.
    pub fn backend(&self) -> Result<Backend, ConfigError> {
        Ok(match self.publisher {
            BackendKind::Kafka => {
                let sasl = match (&self.kafka_username, &self.kafka_password) {
                    (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
                    (None, None) => None,
                    _ => {
                        return Err(ConfigError::InvalidSetting {
                            name: "kafka-username",
                            reason: "username and password must be given together".into(),
                        })
                    }
                };
                Backend::Kafka(KafkaSettings {
                    brokers: self.kafka_brokers.clone(),
                    sasl,
                    tls: self.kafka_tls,
                })
            }
            BackendKind::Redis => Backend::Redis {
                url: self.redis_url.clone(),
                max_len: self.redis_max_len,
            },
            BackendKind::Stdout => Backend::Stdout,
            BackendKind::Memory => Backend::Memory,
        })
    }

    /// Upstream credentials from the flags, the environment or the key file.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        Credentials::resolve(self.bearer_token.as_deref(), self.key_file.as_deref())
    }
}

/// Parses `500ms`, `30s`, `5m`, `1h` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let n: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration `{s}`"))?;
    match unit.trim() {
        "ms" => Ok(Duration::from_millis(n)),
        "" | "s" => Ok(Duration::from_secs(n)),
        "m" => Ok(Duration::from_secs(n.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(n.saturating_mul(3600))),
        other => Err(format!("unknown duration unit `{other}` in `{s}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["geoingest"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn durations_accept_units_and_bare_seconds() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("45"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("3d").is_err());
    }

    #[test]
    fn flags_map_onto_runtime_config() {
        let args = parse(&[
            "--topic",
            "geo",
            "--partition-key",
            "fixed:1",
            "--payload",
            "raw",
            "--stall-policy",
            "alert",
            "--launch-interval",
            "2s",
            "--on-publish-error",
            "retry",
            "--publish-retries",
            "5",
            "--max-retries",
            "10",
        ]);
        let cfg = args.config().unwrap();
        assert_eq!(&*cfg.outbound.topic, "geo");
        assert_eq!(cfg.outbound.key, PartitionKey::Fixed("1".into()));
        assert_eq!(cfg.outbound.format, PayloadFormat::Raw);
        assert_eq!(cfg.stall, StallPolicy::AlertOnly);
        assert_eq!(cfg.launch_interval, Duration::from_secs(2));
        assert_eq!(
            cfg.restart,
            RestartPolicy::OnFailure {
                max_retries: Some(10)
            }
        );
        assert!(matches!(
            cfg.publish_failure,
            PublishFailurePolicy::Retry { attempts: 5, .. }
        ));
    }

    #[test]
    fn unknown_policy_value_is_rejected_by_the_parser() {
        let argv = ["geoingest", "--stall-policy", "sometimes"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn zero_supervise_interval_fails_validation() {
        let args = parse(&["--supervise-interval", "0s"]);
        assert_eq!(args.config().unwrap_err().as_label(), "config_invalid_setting");
    }

    #[test]
    fn kafka_credentials_must_come_in_pairs() {
        let args = parse(&["--publisher", "kafka", "--kafka-username", "u"]);
        assert!(args.backend().is_err());

        let args = parse(&[
            "--publisher",
            "kafka",
            "--kafka-username",
            "u",
            "--kafka-password",
            "p",
            "--kafka-tls",
        ]);
        match args.backend().unwrap() {
            Backend::Kafka(k) => {
                assert_eq!(k.sasl, Some(("u".into(), "p".into())));
                assert!(k.tls);
            }
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn default_backend_is_redis() {
        assert_eq!(parse(&[]).publisher, BackendKind::Redis);
    }
}
