//! Version ids and history entries

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use revisor_store::{Fields, Patch, Value};

use crate::error::{HistoryError, Result};

/// Field holding the flattened snapshot
pub const DATA_FIELD: &str = "data";
/// Field holding the entry timestamp
pub const DATE_FIELD: &str = "date";
/// Field marking a last-state entry
pub const LAST_FIELD: &str = "last";

/// Identifier of a history entry: the event time at microsecond precision
///
/// The id doubles as the entry's `date`, so ordering ids orders entries. Its
/// string form is RFC 3339 with six fractional digits and a `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(DateTime<Utc>);

impl VersionId {
    /// Lower bound of every id
    pub const EARLIEST: VersionId = VersionId(DateTime::<Utc>::MIN_UTC);

    /// Id for an event time
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp.trunc_subsecs(6))
    }

    /// Parse the string form (any RFC 3339 timestamp is accepted)
    pub fn parse(raw: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|ts| Self::from_timestamp(ts.with_timezone(&Utc)))
            .map_err(|_| HistoryError::invalid_version_id(raw))
    }

    /// Underlying timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// Value stored in the live document's pointer field
    pub fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl FromStr for VersionId {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One archived snapshot in a document's ordered log
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Id, equal to the entry date
    pub id: VersionId,
    /// Flattened tracked fields
    pub data: Fields,
    /// Transient snapshot of the true latest state
    pub last: bool,
}

impl HistoryEntry {
    /// Regular entry
    pub fn new(id: VersionId, data: Fields) -> Self {
        Self {
            id,
            data,
            last: false,
        }
    }

    /// Last-state marker
    pub fn marker(id: VersionId, data: Fields) -> Self {
        Self {
            id,
            data,
            last: true,
        }
    }

    /// Stored form: `{data, date, last?}`
    pub fn to_patch(&self) -> Patch {
        let patch = Patch::new()
            .set(DATA_FIELD, Value::Map(self.data.clone()))
            .set(DATE_FIELD, Value::Timestamp(self.id.timestamp()));
        if self.last {
            patch.set(LAST_FIELD, true)
        } else {
            patch
        }
    }

    /// Decode a stored entry; `path` is only used in errors
    pub fn from_stored(path: &str, stored: &Fields) -> Result<Self> {
        let date = stored
            .get(DATE_FIELD)
            .and_then(Value::as_timestamp)
            .ok_or_else(|| HistoryError::corrupt_entry(path, "missing or non-timestamp date"))?;
        let data = match stored.get(DATA_FIELD) {
            Some(Value::Map(data)) => data.clone(),
            Some(other) => {
                return Err(HistoryError::corrupt_entry(
                    path,
                    format!("data is a {}", other.type_name()),
                ))
            }
            None => Fields::new(),
        };
        let last = stored
            .get(LAST_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Self {
            id: VersionId::from_timestamp(date),
            data,
            last,
        })
    }
}
