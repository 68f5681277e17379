use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub mod registration;

/// Serializes a stored unix-millisecond timestamp as RFC 3339 for the wire.
pub(crate) fn rfc3339_millis<S>(millis: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let formatted = OffsetDateTime::from_unix_timestamp_nanos(i128::from(*millis) * 1_000_000)
        .map_err(serde::ser::Error::custom)?
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;

    serializer.serialize_str(&formatted)
}

pub(crate) fn rfc3339_millis_opt<S>(
    millis: &Option<i64>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match millis {
        Some(millis) => rfc3339_millis(millis, serializer),
        None => serializer.serialize_none(),
    }
}

/// Upper-case in storage, lower-case on the wire.
pub(crate) fn lowercase_opt<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(value) => serializer.serialize_str(&value.to_lowercase()),
        None => serializer.serialize_none(),
    }
}

/// Keeps "field absent" distinguishable from "field sent as null/empty", which
/// the notes handling in status updates relies on.
pub(crate) fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
