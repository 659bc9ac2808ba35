//! Serde helpers for the directory service's loosely typed payloads

use chrono::NaiveDate;
use serde::de::{Error, IgnoredAny};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// `null` and missing both decode as `false`
pub fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// `null` decodes as the type's default (an empty list, usually)
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Empty maps arrive as `[]` from the service, so accept an empty list in
/// place of a map. A non-empty list is an error.
pub fn map_or_empty_list<'de, D, K, V>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList<K: Ord, V> {
        Map(BTreeMap<K, V>),
        List(Vec<IgnoredAny>),
    }

    match Option::<MapOrList<K, V>>::deserialize(deserializer)? {
        Some(MapOrList::Map(map)) => Ok(map),
        Some(MapOrList::List(items)) if items.is_empty() => Ok(BTreeMap::new()),
        Some(MapOrList::List(items)) => Err(D::Error::invalid_length(
            items.len(),
            &"a map or an empty list",
        )),
        None => Ok(BTreeMap::new()),
    }
}

/// Dates come as `YYYY-MM-DD` or a full timestamp; only the calendar date is
/// kept and anything unparseable is dropped.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let date_part = value.get(..10).unwrap_or(&value);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }))
}
