// src/protobuf_converter.rs
use crate::core::record::ExtractedTrainingRecord as RustTrainingRecord;
use crate::grpc_service::proto::{ExtractResponse, TrainingRecord};

impl From<RustTrainingRecord> for TrainingRecord {
    fn from(record: RustTrainingRecord) -> Self {
        TrainingRecord {
            title: record.title,
            description: record.description,
            duration: record.duration,
            objectives: record.objectives,
            course_contents: record.course_contents,
            target_audience: record.target_audience,
            methodology: record.methodology,
            certification: record.certification,
            hrdcorp_approval_no: record.hrdcorp_approval_no,
        }
    }
}

impl From<TrainingRecord> for RustTrainingRecord {
    fn from(record: TrainingRecord) -> Self {
        RustTrainingRecord {
            title: record.title,
            description: record.description,
            duration: record.duration,
            objectives: record.objectives,
            course_contents: record.course_contents,
            target_audience: record.target_audience,
            methodology: record.methodology,
            certification: record.certification,
            hrdcorp_approval_no: record.hrdcorp_approval_no,
        }
    }
}

impl From<RustTrainingRecord> for ExtractResponse {
    fn from(record: RustTrainingRecord) -> Self {
        let missing_fields = record
            .missing_fields()
            .into_iter()
            .map(|field| field.as_str().to_string())
            .collect();

        ExtractResponse {
            record: Some(record.into()),
            missing_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_carries_record_and_missing_fields() {
        let record = RustTrainingRecord {
            title: "Advanced Leadership Skills".into(),
            objectives: vec!["Understand core concepts of leadership".into()],
            ..Default::default()
        };
        let response = ExtractResponse::from(record.clone());

        let proto = response.record.clone().unwrap();
        assert_eq!(proto.title, "Advanced Leadership Skills");
        assert_eq!(RustTrainingRecord::from(proto), record);
        assert!(response.missing_fields.contains(&"hrdcorp_approval_no".to_string()));
        assert!(!response.missing_fields.contains(&"objectives".to_string()));
    }
}
