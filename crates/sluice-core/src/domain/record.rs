//! Change records: the storage-change notification as it arrives on the wire,
//! and the normalized `(bucket, key)` pair the rest of the pipeline works on.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Event source string carried by S3 change notifications.
pub const S3_EVENT_SOURCE: &str = "aws:s3";

/// One trigger payload: `{ "Records": [ ... ] }`.
///
/// A payload without `Records` (or with `"Records": null`) is an empty batch.
/// Entries that are not objects decode as undecodable records rather than
/// failing the batch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChangeNotification {
    #[serde(rename = "Records", default, deserialize_with = "lenient_records")]
    pub records: Vec<RawChangeRecord>,
}

/// A single notification entry, exactly as loose as the producer is.
///
/// Every field is optional and a field of the wrong JSON type reads as
/// missing. Missing fields make the record malformed and the filter skips it
/// instead of failing the whole batch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawChangeRecord {
    #[serde(rename = "eventSource", default, deserialize_with = "lenient")]
    pub event_source: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub s3: Option<S3Entity>,

    /// Set when the entry was not a JSON object at all.
    #[serde(skip)]
    pub undecodable: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct S3Entity {
    #[serde(default, deserialize_with = "lenient")]
    pub bucket: Option<NamedEntity>,

    #[serde(default, deserialize_with = "lenient")]
    pub object: Option<ObjectEntity>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NamedEntity {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ObjectEntity {
    #[serde(default, deserialize_with = "lenient")]
    pub key: Option<String>,
}

/// Reads any JSON value and keeps it only if it has the expected shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_records<'de, D>(deserializer: D) -> Result<Vec<RawChangeRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .map(|entry| {
            if !entry.is_object() {
                return RawChangeRecord::undecodable();
            }
            serde_json::from_value(entry).unwrap_or_else(|_| RawChangeRecord::undecodable())
        })
        .collect())
}

impl RawChangeRecord {
    /// Builds a well-formed S3 record. Mostly for tests and local replays.
    pub fn s3(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            event_source: Some(S3_EVENT_SOURCE.to_string()),
            s3: Some(S3Entity {
                bucket: Some(NamedEntity {
                    name: Some(bucket.into()),
                }),
                object: Some(ObjectEntity {
                    key: Some(key.into()),
                }),
            }),
            undecodable: false,
        }
    }

    pub fn undecodable() -> Self {
        Self {
            undecodable: true,
            ..Self::default()
        }
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.s3
            .as_ref()?
            .bucket
            .as_ref()?
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    pub fn object_key(&self) -> Option<&str> {
        self.s3
            .as_ref()?
            .object
            .as_ref()?
            .key
            .as_deref()
            .filter(|key| !key.is_empty())
    }
}

/// A validated change record. Produced by the event filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub event_source: String,
    pub bucket: String,
    pub key: String,
}
