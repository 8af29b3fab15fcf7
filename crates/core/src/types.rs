/// Generation-service job identifiers are opaque strings.
pub type JobId = String;

/// Chat-platform user ids are decimal snowflake strings.
pub type UserId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
