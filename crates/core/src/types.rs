/// Primary key type used by every table.
pub type DbId = i64;

/// UTC timestamp as stored in the database.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifier of a resource on the hosting platform.
pub type RemoteId = u64;
