//! Structured event observer
//!
//! Handlers report what happened through an injected [`Observer`] instead of
//! printing. The production [`LogObserver`] renders events through the global
//! log writer; tests swap in a recorder.

use chrono::{SecondsFormat, Utc};

use crate::config::LoggingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Unknown names fall back to `Info`
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// Something worth reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<'a> {
    /// A record was added to an append-only collection
    RecordAppended {
        collection: &'a str,
        id: &'a str,
        seq: u64,
    },
    /// The announcement was overwritten
    AnnouncementUpdated { updated_at: &'a str, length: usize },
    /// A request body failed validation
    ValidationRejected { path: &'a str, reason: &'a str },
    /// A request ended in an error response
    RequestFailed {
        method: &'a str,
        path: &'a str,
        status: u16,
        error: &'a str,
    },
    /// Readiness check could not reach the store
    StoreCheckFailed { error: &'a str },
}

impl Event<'_> {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RecordAppended { .. } => "record_appended",
            Self::AnnouncementUpdated { .. } => "announcement_updated",
            Self::ValidationRejected { .. } => "validation_rejected",
            Self::RequestFailed { .. } => "request_failed",
            Self::StoreCheckFailed { .. } => "store_check_failed",
        }
    }

    pub const fn level(&self) -> Level {
        match self {
            Self::RecordAppended { .. } | Self::AnnouncementUpdated { .. } => Level::Info,
            Self::ValidationRejected { .. } => Level::Debug,
            Self::RequestFailed { status, .. } if *status < 500 => Level::Warn,
            Self::RequestFailed { .. } | Self::StoreCheckFailed { .. } => Level::Error,
        }
    }

    /// Event payload as ordered key/value pairs
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::RecordAppended {
                collection,
                id,
                seq,
            } => vec![
                ("collection", (*collection).to_string()),
                ("id", (*id).to_string()),
                ("seq", seq.to_string()),
            ],
            Self::AnnouncementUpdated { updated_at, length } => vec![
                ("updated_at", (*updated_at).to_string()),
                ("length", length.to_string()),
            ],
            Self::ValidationRejected { path, reason } => vec![
                ("path", (*path).to_string()),
                ("reason", (*reason).to_string()),
            ],
            Self::RequestFailed {
                method,
                path,
                status,
                error,
            } => vec![
                ("method", (*method).to_string()),
                ("path", (*path).to_string()),
                ("status", status.to_string()),
                ("error", (*error).to_string()),
            ],
            Self::StoreCheckFailed { error } => vec![("error", (*error).to_string())],
        }
    }
}

/// Observability collaborator injected into request handling
pub trait Observer: Send + Sync {
    fn record(&self, event: &Event<'_>);
}

/// Observer that writes one line per event through the logger
pub struct LogObserver {
    min_level: Level,
    json: bool,
}

impl LogObserver {
    pub fn from_config(logging: &LoggingConfig) -> Self {
        Self {
            min_level: Level::parse(&logging.level),
            json: logging.event_format == "json",
        }
    }

    fn render(&self, event: &Event<'_>) -> String {
        let level = event.level();
        if self.json {
            let mut object = serde_json::Map::new();
            object.insert(
                "time".to_string(),
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true).into(),
            );
            object.insert("level".to_string(), level.as_str().into());
            object.insert("event".to_string(), event.name().into());
            for (key, value) in event.fields() {
                object.insert(key.to_string(), value.into());
            }
            serde_json::Value::Object(object).to_string()
        } else {
            let fields = event
                .fields()
                .into_iter()
                .map(|(key, value)| {
                    if value.contains(' ') {
                        format!("{key}={value:?}")
                    } else {
                        format!("{key}={value}")
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            format!("[{}] {} {fields}", level.as_str(), event.name())
        }
    }
}

impl Observer for LogObserver {
    fn record(&self, event: &Event<'_>) {
        let level = event.level();
        if level < self.min_level {
            return;
        }
        let line = self.render(event);
        if level >= Level::Warn {
            super::write_error(&line);
        } else {
            super::write_info(&line);
        }
    }
}

/// Observer that keeps every event in memory
#[cfg(test)]
#[derive(Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<(&'static str, Vec<(&'static str, String)>)>>,
}

#[cfg(test)]
impl RecordingObserver {
    /// Names of recorded events, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|(name, _)| *name).collect()
    }

    /// Value of `field` in the most recent event called `name`
    pub fn last_field(&self, name: &str, field: &str) -> Option<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .and_then(|(_, fields)| {
                fields
                    .iter()
                    .find(|(key, _)| *key == field)
                    .map(|(_, value)| value.clone())
            })
    }
}

#[cfg(test)]
impl Observer for RecordingObserver {
    fn record(&self, event: &Event<'_>) {
        self.events
            .lock()
            .unwrap()
            .push((event.name(), event.fields()));
    }
}
