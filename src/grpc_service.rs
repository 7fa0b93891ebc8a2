use crate::core::parser::DecodeError;
use crate::utils::document_processor::DocumentProcessor;
use log::{debug, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{transport::Server, Request, Response, Status};

pub mod proto {
    tonic::include_proto!("course_intake.v1");
}

use proto::course_intake_server::{CourseIntake, CourseIntakeServer};
use proto::{ExtractRequest, ExtractResponse, TextRequest};

pub struct CourseIntakeService {
    processor: Arc<DocumentProcessor>,
}

impl CourseIntakeService {
    pub fn new(processor: DocumentProcessor) -> Self {
        Self {
            processor: Arc::new(processor),
        }
    }
}

fn decode_status(e: DecodeError) -> Status {
    match e {
        DecodeError::Io { .. } | DecodeError::Read(_) => Status::internal(e.to_string()),
        _ => Status::invalid_argument(e.to_string()),
    }
}

#[tonic::async_trait]
impl CourseIntake for CourseIntakeService {
    async fn extract_training(
        &self,
        request: Request<ExtractRequest>,
    ) -> Result<Response<ExtractResponse>, Status> {
        let req = request.into_inner();
        debug!("ExtractTraining {} ({} bytes)", req.file_name, req.content.len());

        // Decoding runs on the blocking pool
        let processor = Arc::clone(&self.processor);
        let report = tokio::task::spawn_blocking(move || {
            processor.extract_upload(&req.file_name, &req.content)
        })
        .await
        .map_err(|e| Status::internal(format!("extraction task failed: {}", e)))?
        .map_err(decode_status)?;

        Ok(Response::new(report.record.into()))
    }

    async fn extract_text(
        &self,
        request: Request<TextRequest>,
    ) -> Result<Response<ExtractResponse>, Status> {
        let req = request.into_inner();
        let record = self.processor.extractor().extract(&req.text);
        Ok(Response::new(record.into()))
    }
}

pub fn make_server(processor: DocumentProcessor) -> CourseIntakeServer<CourseIntakeService> {
    CourseIntakeServer::new(CourseIntakeService::new(processor))
}

/// Serve until Ctrl-C.
pub async fn start_grpc_server(addr: SocketAddr, processor: DocumentProcessor) -> anyhow::Result<()> {
    info!("Starting gRPC server on {}", addr);

    Server::builder()
        .add_service(make_server(processor))
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extract_text_returns_record() {
        let service = CourseIntakeService::new(DocumentProcessor::new());
        let response = service
            .extract_text(Request::new(TextRequest {
                text: "HRDCorp Approval No: 10001234".into(),
            }))
            .await
            .unwrap()
            .into_inner();

        let record = response.record.unwrap();
        assert_eq!(record.hrdcorp_approval_no, "10001234");
        assert!(response.missing_fields.contains(&"title".to_string()));
    }

    #[tokio::test]
    async fn extract_training_decodes_upload() {
        let service = CourseIntakeService::new(DocumentProcessor::new());
        let response = service
            .extract_training(Request::new(ExtractRequest {
                file_name: "outline.txt".into(),
                content: b"This is a 3-day course on management.".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.record.unwrap().duration, "3 days");
    }

    #[tokio::test]
    async fn unsupported_upload_is_invalid_argument() {
        let service = CourseIntakeService::new(DocumentProcessor::new());
        let status = service
            .extract_training(Request::new(ExtractRequest {
                file_name: "deck.pptx".into(),
                content: b"slides".to_vec(),
            }))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
}
