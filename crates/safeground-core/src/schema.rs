//! Arrow schema for resolved evalNm records handed to the persistence layer.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::model::ResolvedRecord;

/// Schema for resolution output: one row per input record.
///
/// `district_id`/`tier` are null for misses, `reason` is null for matches,
/// `area_hint` is set only for unmatched rows that named a single gu.
pub fn resolution_schema() -> Schema {
    Schema::new(vec![
        Field::new("source", DataType::Utf8, false),
        Field::new("normalized", DataType::Utf8, false),
        Field::new("outcome", DataType::Utf8, false),
        Field::new("district_id", DataType::Utf8, true),
        Field::new("tier", DataType::Utf8, true),
        Field::new("reason", DataType::Utf8, true),
        Field::new("area_hint", DataType::Utf8, true),
    ])
}

/// Convert resolved records into a single RecordBatch in input order.
pub fn records_to_batch(records: &[ResolvedRecord]) -> Result<RecordBatch, ArrowError> {
    let source: StringArray = records.iter().map(|r| Some(r.source.as_str())).collect();
    let normalized: StringArray = records
        .iter()
        .map(|r| Some(r.normalized.as_str()))
        .collect();
    let outcome: StringArray = records
        .iter()
        .map(|r| Some(if r.result.is_match() { "matched" } else { "unmatched" }))
        .collect();
    let district_id: StringArray = records.iter().map(|r| r.result.district_id()).collect();
    let tier: StringArray = records
        .iter()
        .map(|r| r.result.tier().map(|t| t.as_str()))
        .collect();
    let reason: StringArray = records
        .iter()
        .map(|r| r.result.reason().map(|u| u.as_str()))
        .collect();
    let area_hint: StringArray = records.iter().map(|r| r.area_hint.as_deref()).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(source),
        Arc::new(normalized),
        Arc::new(outcome),
        Arc::new(district_id),
        Arc::new(tier),
        Arc::new(reason),
        Arc::new(area_hint),
    ];
    RecordBatch::try_new(Arc::new(resolution_schema()), columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResolutionResult, Tier, UnmatchedReason};
    use arrow::array::Array;

    fn record(source: &str, result: ResolutionResult) -> ResolvedRecord {
        ResolvedRecord {
            source: source.to_string(),
            normalized: source.to_string(),
            result,
            area_hint: None,
        }
    }

    #[test]
    fn resolution_schema_has_expected_fields() {
        let schema = resolution_schema();
        assert_eq!(schema.fields().len(), 7);
        assert!(schema.field_with_name("district_id").unwrap().is_nullable());
        assert!(!schema.field_with_name("source").unwrap().is_nullable());
    }

    #[test]
    fn batch_nulls_follow_outcome() {
        let records = vec![
            record("종로구 청운동", ResolutionResult::matched("11110", Tier::Exact)),
            record("", ResolutionResult::unmatched(UnmatchedReason::EmptyOrNoise)),
        ];
        let batch = records_to_batch(&records).unwrap();
        assert_eq!(batch.num_rows(), 2);

        let ids = batch
            .column_by_name("district_id")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(ids.value(0), "11110");
        assert!(ids.is_null(1));

        let reasons = batch
            .column_by_name("reason")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert!(reasons.is_null(0));
        assert_eq!(reasons.value(1), "empty_or_noise");
    }

    #[test]
    fn area_hint_column() {
        let mut partial = record(
            "강남구 역삼동 지반침하",
            ResolutionResult::unmatched(UnmatchedReason::NoConfidentMatch),
        );
        partial.area_hint = Some("강남구".into());
        let records = vec![
            partial,
            record("종로구 청운동", ResolutionResult::matched("11110", Tier::Exact)),
        ];
        let batch = records_to_batch(&records).unwrap();
        let hints = batch
            .column_by_name("area_hint")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(hints.value(0), "강남구");
        assert!(hints.is_null(1));
    }

    #[test]
    fn empty_batch() {
        let batch = records_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 7);
    }
}
