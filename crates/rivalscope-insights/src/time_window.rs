//! "Created in the last N days" predicates.

use chrono::{DateTime, Utc};
use rivalscope_core::{Error, ObjectId, RecencySource, Result};
use rivalscope_store::Filter;
use serde_json::Value;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    days: u32,
}

impl TimeWindow {
    pub const WEEK: TimeWindow = TimeWindow { days: 7 };
    pub const MONTH: TimeWindow = TimeWindow { days: 30 };

    pub fn days(days: u32) -> Result<Self> {
        if days == 0 {
            return Err(Error::InvalidArgument(
                "time window must span at least one day".to_string(),
            ));
        }
        Ok(Self { days })
    }

    pub fn len_days(&self) -> u32 {
        self.days
    }

    /// Start of the window, floored to whole seconds. Never earlier than the
    /// Unix epoch.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = (now.timestamp() - self.days as i64 * SECONDS_PER_DAY).max(0);
        DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Smallest identifier created at the window start; every record created
    /// at or after the start has an identifier `>=` this bound.
    pub fn lower_bound(&self, now: DateTime<Utc>) -> ObjectId {
        ObjectId::from_datetime(self.start(now))
    }

    /// Predicate selecting records created inside the window.
    pub fn filter(&self, now: DateTime<Utc>, source: &RecencySource) -> Filter {
        match source {
            RecencySource::ObjectId => Filter::IdGte(self.lower_bound(now)),
            RecencySource::CreatedAtField(field) => {
                Filter::gte(field, Value::from(self.start(now).timestamp()))
            }
        }
    }
}
