/// User ids are PostgreSQL BIGSERIAL, carried in the JWT `sub` claim.
pub type DbId = i64;

/// Render jobs are addressed by an opaque UUID so share links cannot be
/// enumerated.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
