use chrono::{SecondsFormat, Utc};

/// Current UTC instant as RFC 3339 with millisecond precision.
pub fn rfc3339_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
