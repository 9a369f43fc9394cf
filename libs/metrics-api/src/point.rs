use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Retention of raw points: 7 days, in seconds.
///
/// Every raw write carries this TTL; it is not configurable per call.
pub const RAW_TTL_SECONDS: u32 = 7 * 24 * 60 * 60;

/// Tag distinguishing raw samples from derived aggregates that share a timestamp.
///
/// Values are keyed by kind in declaration order, so the order of the
/// variants is part of the storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Raw,
    Max,
    Min,
    Avg,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Raw => write!(f, "raw"),
            DataKind::Max => write!(f, "max"),
            DataKind::Min => write!(f, "min"),
            DataKind::Avg => write!(f, "avg"),
        }
    }
}

/// A single raw sample as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataPoint {
    /// Logical series grouping (table partition in the store).
    pub bucket: String,
    /// Series identifier within the bucket.
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Sample value.
    pub value: f64,
}

impl RawDataPoint {
    pub fn new(bucket: impl Into<String>, id: impl Into<String>, timestamp: i64, value: f64) -> Self {
        Self {
            bucket: bucket.into(),
            id: id.into(),
            timestamp,
            value,
        }
    }
}

impl fmt::Display for RawDataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}={}", self.bucket, self.id, self.timestamp, self.value)
    }
}

/// One insert sent to the storage collaborator.
///
/// `values` is keyed by kind so several derived values for the same timestamp
/// can be written together; ingestion only fills [`DataKind::Raw`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub bucket: String,
    pub id: String,
    pub timestamp: i64,
    pub values: BTreeMap<DataKind, f64>,
    pub ttl_seconds: u32,
}

impl WriteRequest {
    /// Build the insert for a raw point with the fixed raw retention.
    pub fn raw(point: &RawDataPoint) -> Self {
        Self {
            bucket: point.bucket.clone(),
            id: point.id.clone(),
            timestamp: point.timestamp,
            values: BTreeMap::from([(DataKind::Raw, point.value)]),
            ttl_seconds: RAW_TTL_SECONDS,
        }
    }
}

/// A stored point as returned by a range read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub bucket: String,
    pub id: String,
    pub timestamp: i64,
    pub values: BTreeMap<DataKind, f64>,
}

impl DataPoint {
    pub fn value(&self, kind: DataKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_ttl_is_seven_days() {
        assert_eq!(RAW_TTL_SECONDS, 604_800);
    }

    #[test]
    fn raw_request_carries_only_raw_value() {
        let point = RawDataPoint::new("cpu", "host-1", 1_700_000_000_000, 0.75);
        let req = WriteRequest::raw(&point);

        assert_eq!(req.bucket, "cpu");
        assert_eq!(req.id, "host-1");
        assert_eq!(req.timestamp, 1_700_000_000_000);
        assert_eq!(req.ttl_seconds, 604_800);
        assert_eq!(req.values.len(), 1);
        assert_eq!(req.values.get(&DataKind::Raw), Some(&0.75));
    }

    #[test]
    fn kinds_sort_in_declaration_order() {
        let values = BTreeMap::from([
            (DataKind::Avg, 4.0),
            (DataKind::Raw, 1.0),
            (DataKind::Min, 3.0),
            (DataKind::Max, 2.0),
        ]);
        let kinds: Vec<_> = values.keys().map(|k| k.to_string()).collect();
        assert_eq!(kinds, ["raw", "max", "min", "avg"]);
    }

    #[test]
    fn raw_point_from_json() {
        let point: RawDataPoint =
            serde_json::from_str(r#"{"bucket":"mem","id":"h2","timestamp":10,"value":1.5}"#).unwrap();
        assert_eq!(point, RawDataPoint::new("mem", "h2", 10, 1.5));
    }

    #[test]
    fn data_point_json_uses_kind_names() {
        let point = DataPoint {
            bucket: "cpu".into(),
            id: "h1".into(),
            timestamp: 5,
            values: BTreeMap::from([(DataKind::Raw, 2.0)]),
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["values"]["raw"], 2.0);
    }
}
