//! # Messages read from an upstream subscription.
//!
//! The filter stream is newline-delimited JSON. Each line is one of:
//!
//! ```text
//! ""                                   → Control(KeepAlive)
//! {"warning": {"code", "message", "percent_full"}}  → Control(StallWarning)
//! {"limit": {"track": n}}              → Control(Limit)
//! {"disconnect": {"code", "reason"}}   → Control(Disconnect)
//! {"id": .., "id_str": .., ...}        → Post
//! anything else                        → Control(Other)
//! ```
//!
//! Only [`StreamMessage::Post`] counts as activity.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::SubscriptionError;

/// Keys that mark a line as a control notice rather than an item.
const CONTROL_KEYS: [&str; 6] = [
    "warning",
    "limit",
    "disconnect",
    "delete",
    "scrub_geo",
    "status_withheld",
];

/// One accepted item, kept as the exact JSON text received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    id: Option<Arc<str>>,
    raw: Arc<str>,
}

impl Post {
    /// Wraps a JSON object line. Returns `None` when `raw` is not a JSON object.
    pub fn from_json(raw: impl Into<Arc<str>>) -> Option<Self> {
        let raw = raw.into();
        let value: Value = serde_json::from_str(&raw).ok()?;
        let obj = value.as_object()?;
        Some(Self {
            id: post_id(obj),
            raw,
        })
    }

    /// Upstream item id (`id_str`, falling back to `id`).
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Exact JSON text as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Out-of-band notice on a subscription.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlMessage {
    /// Blank line sent to keep the connection open.
    KeepAlive,
    /// The client is falling behind and may be disconnected.
    StallWarning {
        /// Upstream warning code.
        code: String,
        /// Upstream message text.
        message: String,
        /// How full the upstream send queue is.
        percent_full: Option<u64>,
    },
    /// Items matched the filter but were not delivered due to rate limits.
    Limit {
        /// Undelivered items since the connection opened.
        undelivered: u64,
    },
    /// The upstream is about to close the connection.
    Disconnect {
        /// Upstream disconnect code.
        code: i64,
        /// Upstream reason text.
        reason: String,
    },
    /// Any other non-item JSON object (deletion notices, withheld content, ...).
    Other(Value),
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMessage::KeepAlive => f.write_str("keep-alive"),
            ControlMessage::StallWarning {
                code,
                message,
                percent_full,
            } => match percent_full {
                Some(p) => write!(f, "stall warning {code} ({p}% full): {message}"),
                None => write!(f, "stall warning {code}: {message}"),
            },
            ControlMessage::Limit { undelivered } => {
                write!(f, "rate limited, {undelivered} undelivered")
            }
            ControlMessage::Disconnect { code, reason } => {
                write!(f, "disconnect notice {code}: {reason}")
            }
            ControlMessage::Other(v) => {
                let kind = v
                    .as_object()
                    .and_then(|o| o.keys().next())
                    .map_or("unknown", String::as_str);
                write!(f, "notice `{kind}`")
            }
        }
    }
}

/// One message read from a subscription.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    /// An accepted item.
    Post(Post),
    /// An out-of-band notice.
    Control(ControlMessage),
}

impl StreamMessage {
    /// Classifies one line of the filter stream.
    pub fn from_line(line: &[u8]) -> Result<Self, SubscriptionError> {
        let text = std::str::from_utf8(line)
            .map_err(|e| SubscriptionError::Decode(e.to_string()))?
            .trim();
        if text.is_empty() {
            return Ok(StreamMessage::Control(ControlMessage::KeepAlive));
        }

        let value: Value =
            serde_json::from_str(text).map_err(|e| SubscriptionError::Decode(e.to_string()))?;
        let Some(obj) = value.as_object() else {
            return Ok(StreamMessage::Control(ControlMessage::Other(value)));
        };

        if let Some(w) = obj.get("warning") {
            return Ok(StreamMessage::Control(ControlMessage::StallWarning {
                code: str_field(w, "code"),
                message: str_field(w, "message"),
                percent_full: w.get("percent_full").and_then(Value::as_u64),
            }));
        }
        if let Some(l) = obj.get("limit") {
            return Ok(StreamMessage::Control(ControlMessage::Limit {
                undelivered: l.get("track").and_then(Value::as_u64).unwrap_or(0),
            }));
        }
        if let Some(d) = obj.get("disconnect") {
            return Ok(StreamMessage::Control(ControlMessage::Disconnect {
                code: d.get("code").and_then(Value::as_i64).unwrap_or(0),
                reason: str_field(d, "reason"),
            }));
        }
        if CONTROL_KEYS.iter().any(|k| obj.contains_key(*k)) || post_id(obj).is_none() {
            return Ok(StreamMessage::Control(ControlMessage::Other(value)));
        }

        Ok(StreamMessage::Post(Post {
            id: post_id(obj),
            raw: Arc::from(text),
        }))
    }
}

fn post_id(obj: &serde_json::Map<String, Value>) -> Option<Arc<str>> {
    match (obj.get("id_str"), obj.get("id")) {
        (Some(Value::String(s)), _) => Some(Arc::from(s.as_str())),
        (_, Some(Value::String(s))) => Some(Arc::from(s.as_str())),
        (_, Some(Value::Number(n))) => Some(Arc::from(n.to_string())),
        _ => None,
    }
}

fn str_field(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(line: &str) -> ControlMessage {
        match StreamMessage::from_line(line.as_bytes()).unwrap() {
            StreamMessage::Control(c) => c,
            other => panic!("expected control, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_are_keep_alives() {
        assert_eq!(control(""), ControlMessage::KeepAlive);
        assert_eq!(control("\r\n"), ControlMessage::KeepAlive);
    }

    #[test]
    fn posts_keep_exact_text_and_id() {
        let line = r#"{"id":1234,"id_str":"1234","text":"hello  world"}"#;
        let msg = StreamMessage::from_line(format!("{line}\r\n").as_bytes()).unwrap();
        let StreamMessage::Post(post) = msg else {
            panic!("expected post");
        };
        assert_eq!(post.id(), Some("1234"));
        assert_eq!(post.raw(), line);
    }

    #[test]
    fn numeric_id_is_accepted() {
        let post = Post::from_json(r#"{"id":42,"text":"x"}"#).unwrap();
        assert_eq!(post.id(), Some("42"));
    }

    #[test]
    fn stall_warning_is_classified() {
        let c = control(
            r#"{"warning":{"code":"FALLING_BEHIND","message":"queue is full","percent_full":60}}"#,
        );
        assert_eq!(
            c,
            ControlMessage::StallWarning {
                code: "FALLING_BEHIND".into(),
                message: "queue is full".into(),
                percent_full: Some(60),
            }
        );
        assert!(c.to_string().contains("60% full"));
    }

    #[test]
    fn limit_and_disconnect_are_classified() {
        assert_eq!(
            control(r#"{"limit":{"track":17}}"#),
            ControlMessage::Limit { undelivered: 17 }
        );
        assert_eq!(
            control(r#"{"disconnect":{"code":7,"stream_name":"x","reason":"admin logout"}}"#),
            ControlMessage::Disconnect {
                code: 7,
                reason: "admin logout".into()
            }
        );
    }

    #[test]
    fn deletion_notice_is_not_a_post() {
        let c = control(r#"{"delete":{"status":{"id":1,"id_str":"1"}}}"#);
        assert!(matches!(c, ControlMessage::Other(_)));
        assert_eq!(c.to_string(), "notice `delete`");
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = StreamMessage::from_line(b"{not json").unwrap_err();
        assert_eq!(err.as_label(), "subscription_decode");
    }
}
