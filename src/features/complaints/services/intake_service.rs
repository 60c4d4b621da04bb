//! Complaint-intake pipeline: location, four AI stages, merge, store.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::complaints::dtos::AcknowledgementDto;
use crate::features::complaints::models::{ComplaintCategory, NewComplaint, Priority};
use crate::features::complaints::services::{ComplaintService, LocationInput, LocationService};
use crate::modules::ai::{AiClient, FormalReport, ImageAnalysis, ReportInput, TextAnalysis};
use crate::shared::constants::{
    AUDIO_FALLBACK_TRANSCRIPTION, DEFAULT_AUDIO_MIME_TYPE, DEFAULT_IMAGE_MIME_TYPE,
    DEFAULT_SUBJECT, DEFAULT_SUBMITTED_BY, DEFAULT_ZONE,
};

/// One uploaded file
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Upload {
    fn mime_type_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .unwrap_or(default)
    }
}

/// Everything a citizen sent with one complaint
#[derive(Debug, Clone, Default)]
pub struct IntakeSubmission {
    pub image: Option<Upload>,
    pub audio: Option<Upload>,
    pub description: Option<String>,
    pub location_text: Option<String>,
    pub device_latitude: Option<String>,
    pub device_longitude: Option<String>,
    pub user_id: Option<i64>,
}

pub struct IntakeService {
    ai: AiClient,
    location: Arc<LocationService>,
    complaints: Arc<ComplaintService>,
    scratch_dir: PathBuf,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Final category and priority. Text analysis wins over image analysis;
/// labels outside the fixed sets count as missing.
pub fn merge_classification(
    image: &ImageAnalysis,
    text: &TextAnalysis,
) -> (ComplaintCategory, Priority) {
    let category = text
        .category
        .as_deref()
        .and_then(ComplaintCategory::from_label)
        .or_else(|| {
            image
                .category
                .as_deref()
                .and_then(ComplaintCategory::from_label)
        })
        .unwrap_or(ComplaintCategory::Other);

    let priority = text
        .priority
        .as_deref()
        .and_then(Priority::from_label)
        .unwrap_or_default();

    (category, priority)
}

impl IntakeService {
    pub fn new(
        ai: AiClient,
        location: Arc<LocationService>,
        complaints: Arc<ComplaintService>,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            ai,
            location,
            complaints,
            scratch_dir,
        }
    }

    /// Run the pipeline on its own task so that a client hanging up does not
    /// abandon a submission halfway.
    pub async fn submit_detached(
        self: &Arc<Self>,
        submission: IntakeSubmission,
    ) -> Result<AcknowledgementDto> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.submit(submission).await })
            .await
            .map_err(|e| AppError::Internal(format!("Intake task failed: {}", e)))?
    }

    pub async fn submit(&self, submission: IntakeSubmission) -> Result<AcknowledgementDto> {
        // 1. Inputs
        let image = submission
            .image
            .as_ref()
            .filter(|upload| !upload.bytes.is_empty())
            .ok_or_else(|| AppError::Validation("An image of the issue is required".to_string()))?;
        let audio = submission.audio.as_ref().filter(|upload| !upload.bytes.is_empty());
        let text = present(submission.description.as_deref());

        if text.is_none() && audio.is_none() {
            return Err(AppError::Validation(
                "Describe the issue in text or attach a voice note".to_string(),
            ));
        }

        // 2. Location
        let resolved = self
            .location
            .resolve(LocationInput {
                latitude: submission.device_latitude.as_deref(),
                longitude: submission.device_longitude.as_deref(),
                manual_address: submission.location_text.as_deref(),
            })
            .await?;
        tracing::info!(stage = "location", location = %resolved.location, "Location resolved");

        // 3. Image
        let image_analysis = self
            .ai
            .classify_image(&image.bytes, image.mime_type_or(DEFAULT_IMAGE_MIME_TYPE))
            .await
            .map_err(|e| AppError::Upstream {
                stage: "Image analysis",
                detail: e.to_string(),
            })?;
        tracing::info!(stage = "image_analysis", category = ?image_analysis.category, "Stage finished");

        // 4. Audio
        let mut description = text.unwrap_or_default().to_string();
        let transcription = match audio {
            Some(audio) => {
                let transcription = self.transcribe(audio).await;
                description.push_str(&format!(
                    "\n\n(Voice Note Transcription: {})",
                    transcription
                ));
                Some(transcription)
            }
            None => None,
        };

        // 5. Accumulated description
        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(AppError::Validation(
                "Complaint description is empty".to_string(),
            ));
        }

        // 6. Text
        let text_analysis = self
            .ai
            .classify_text(&description)
            .await
            .map_err(|e| AppError::Upstream {
                stage: "Text analysis",
                detail: e.to_string(),
            })?;
        tracing::info!(
            stage = "text_analysis",
            category = ?text_analysis.category,
            priority = ?text_analysis.priority,
            "Stage finished"
        );

        // 7. Report
        let report = self
            .ai
            .synthesize_report(&ReportInput {
                image: &image_analysis,
                transcription: transcription.as_deref(),
                text: &text_analysis,
                location: &resolved.location,
            })
            .await
            .map_err(|e| AppError::Upstream {
                stage: "Report generation",
                detail: e.to_string(),
            })?;
        tracing::info!(stage = "report_synthesis", "Stage finished");

        // 8. Merge
        let (category, priority) = merge_classification(&image_analysis, &text_analysis);
        let FormalReport {
            subject,
            description: formal_description,
            zone,
        } = report;

        let complaint = NewComplaint {
            user_id: submission.user_id,
            category,
            priority,
            subject: present(subject.as_deref())
                .unwrap_or(DEFAULT_SUBJECT)
                .to_string(),
            description: present(formal_description.as_deref())
                .unwrap_or(&description)
                .to_string(),
            location: resolved.location,
            zone: present(zone.as_deref()).unwrap_or(DEFAULT_ZONE).to_string(),
            gps: resolved.coordinates,
            submitted_by: DEFAULT_SUBMITTED_BY.to_string(),
        };

        // 9. Store
        let stored = self.complaints.create(&complaint).await?;

        Ok(AcknowledgementDto {
            complaint_id: stored.id,
            ghmc_id: stored.ghmc_id,
            subject: complaint.subject,
            category,
            priority,
        })
    }

    /// Transcribe a voice note via a scratch file that is removed on every
    /// exit path. Scratch I/O problems degrade like any other audio failure.
    async fn transcribe(&self, audio: &Upload) -> String {
        let scratch = match tempfile::Builder::new()
            .prefix("complaint-audio-")
            .tempfile_in(&self.scratch_dir)
        {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Could not create audio scratch file: {}", e);
                return AUDIO_FALLBACK_TRANSCRIPTION.to_string();
            }
        };

        let transcription = match tokio::fs::write(scratch.path(), &audio.bytes).await {
            Ok(()) => {
                self.ai
                    .transcribe_audio(scratch.path(), audio.mime_type_or(DEFAULT_AUDIO_MIME_TYPE))
                    .await
                    .transcription
            }
            Err(e) => {
                tracing::warn!("Could not write audio scratch file: {}", e);
                AUDIO_FALLBACK_TRANSCRIPTION.to_string()
            }
        };

        if let Err(e) = scratch.close() {
            tracing::warn!("Could not remove audio scratch file: {}", e);
        }

        tracing::info!(stage = "audio_transcription", "Stage finished");
        transcription
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AdminSeedConfig;
    use crate::core::database::Database;
    use crate::core::schema;
    use crate::features::complaints::services::location_service::testing::FixedGeocoder;
    use crate::modules::ai::testing::ScriptedModel;
    use crate::modules::ai::{AiError, RetryPolicy};

    const IMAGE_REPLY: &str =
        r#"{"summary": "A deep pothole on an asphalt road", "category": "Pothole/Damaged Road"}"#;
    const TEXT_REPLY: &str = r#"{"category": "Pothole/Damaged Road", "priority": "high", "summary": "Pothole", "actionable_steps": ["Fill it"]}"#;
    const REPORT_REPLY: &str = r#"{"subject": "Pothole on Main Road", "description": "A deep pothole endangers traffic.", "zone": "Khairatabad"}"#;

    struct Harness {
        service: IntakeService,
        model: Arc<ScriptedModel>,
        geocoder: Arc<FixedGeocoder>,
        complaints: Arc<ComplaintService>,
        db: Arc<Database>,
        scratch: tempfile::TempDir,
    }

    async fn harness(
        replies: Vec<std::result::Result<String, AiError>>,
        geocoder: FixedGeocoder,
    ) -> Harness {
        let db = Database::connect_in_memory().await.unwrap();
        schema::initialize(&db, &AdminSeedConfig::default())
            .await
            .unwrap();
        let db = Arc::new(db);
        let complaints = Arc::new(ComplaintService::new(db.clone()));
        let model = Arc::new(ScriptedModel::new(replies));
        let geocoder = Arc::new(geocoder);
        let scratch = tempfile::tempdir().unwrap();

        let service = IntakeService::new(
            AiClient::with_model(model.clone(), RetryPolicy::new(3)),
            Arc::new(LocationService::new(geocoder.clone())),
            complaints.clone(),
            scratch.path().to_path_buf(),
        );

        Harness {
            service,
            model,
            geocoder,
            complaints,
            db,
            scratch,
        }
    }

    fn ok(reply: &str) -> std::result::Result<String, AiError> {
        Ok(reply.to_string())
    }

    fn image() -> Option<Upload> {
        Some(Upload {
            bytes: vec![0xFF, 0xD8, 0xFF],
            content_type: Some("image/jpeg".to_string()),
        })
    }

    #[tokio::test]
    async fn test_gps_submission_is_stored_with_coordinates() {
        let h = harness(
            vec![ok(IMAGE_REPLY), ok(TEXT_REPLY), ok(REPORT_REPLY)],
            FixedGeocoder::address("Somajiguda, Hyderabad"),
        )
        .await;

        let ack = h
            .service
            .submit(IntakeSubmission {
                image: image(),
                description: Some("pothole on road".to_string()),
                device_latitude: Some("17.38".to_string()),
                device_longitude: Some("78.48".to_string()),
                user_id: Some(9),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(ack.category, ComplaintCategory::DamagedRoad);
        assert_eq!(ack.priority, Priority::High);
        assert_eq!(ack.subject, "Pothole on Main Road");

        let stored = h.complaints.get(ack.complaint_id).await.unwrap();
        assert_eq!(stored.gps_lat, Some(17.38));
        assert_eq!(stored.gps_lng, Some(78.48));
        assert_eq!(stored.location, "Somajiguda, Hyderabad");
        assert_eq!(stored.zone, "Khairatabad");
        assert_eq!(stored.user_id, Some(9));
        assert_eq!(stored.submitted_by, "Citizen");
        assert_eq!(h.model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_location_invokes_no_ai_stage() {
        let h = harness(vec![], FixedGeocoder::address("unused")).await;

        let result = h
            .service
            .submit(IntakeSubmission {
                image: image(),
                description: Some("garbage everywhere".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(h.model.call_count(), 0);
        assert_eq!(h.geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_image_or_content_is_rejected() {
        let h = harness(vec![], FixedGeocoder::address("unused")).await;

        let no_image = h
            .service
            .submit(IntakeSubmission {
                description: Some("tree fell".to_string()),
                location_text: Some("Abids".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(no_image, Err(AppError::Validation(_))));

        let no_content = h
            .service
            .submit(IntakeSubmission {
                image: image(),
                description: Some("   ".to_string()),
                location_text: Some("Abids".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(no_content, Err(AppError::Validation(_))));
        assert_eq!(h.model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_voice_note_is_appended_and_scratch_removed() {
        let h = harness(
            vec![
                ok(IMAGE_REPLY),
                ok("There is a big pothole near my house"),
                ok(TEXT_REPLY),
                ok(REPORT_REPLY),
            ],
            FixedGeocoder::address("unused"),
        )
        .await;

        h.service
            .submit(IntakeSubmission {
                image: image(),
                audio: Some(Upload {
                    bytes: b"webm-bytes".to_vec(),
                    content_type: Some("audio/ogg".to_string()),
                }),
                location_text: Some("Kukatpally".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let requests = h.model.requests();
        assert_eq!(requests[1].attachments[0].mime_type, "audio/ogg");
        assert_eq!(requests[1].attachments[0].data, b"webm-bytes".to_vec());
        assert!(requests[2]
            .prompt
            .contains("(Voice Note Transcription: There is a big pothole near my house)"));
        assert_eq!(std::fs::read_dir(h.scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_image_stage_stores_nothing() {
        let h = harness(
            vec![Err(AiError::RequestFailed("HTTP 403: API key invalid".to_string()))],
            FixedGeocoder::address("unused"),
        )
        .await;

        let result = h
            .service
            .submit(IntakeSubmission {
                image: image(),
                description: Some("sewage overflow".to_string()),
                location_text: Some("Malakpet".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(
            result,
            Err(AppError::Upstream { stage: "Image analysis", .. })
        ));
        assert_eq!(h.model.call_count(), 1);
        assert!(h.complaints.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_defaults_fill_missing_fields() {
        let h = harness(
            vec![
                ok(r#"{"summary": "dog", "category": "Stray Animals"}"#),
                ok(r#"{"category": "Unknown Thing", "priority": "critical"}"#),
                ok(r#"{"zone": "Charminar", "subject": "  "}"#),
            ],
            FixedGeocoder::address("unused"),
        )
        .await;

        let ack = h
            .service
            .submit(IntakeSubmission {
                image: image(),
                description: Some("  stray dogs chasing kids  ".to_string()),
                location_text: Some("Tolichowki".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(ack.category, ComplaintCategory::StrayAnimals);
        assert_eq!(ack.priority, Priority::Medium);
        assert_eq!(ack.subject, DEFAULT_SUBJECT);

        let stored = h.complaints.get(ack.complaint_id).await.unwrap();
        assert_eq!(stored.description, "stray dogs chasing kids");
        assert_eq!(stored.zone, "Charminar");
        assert_eq!(stored.gps_lat, None);
    }

    #[tokio::test]
    async fn test_missing_zone_defaults_to_unknown() {
        let h = harness(
            vec![
                ok(IMAGE_REPLY),
                ok(TEXT_REPLY),
                ok(r#"{"subject": "Pothole", "description": "Deep pothole."}"#),
            ],
            FixedGeocoder::address("unused"),
        )
        .await;

        let ack = h
            .service
            .submit(IntakeSubmission {
                image: image(),
                description: Some("pothole".to_string()),
                location_text: Some("Uppal".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let stored = h.complaints.get(ack.complaint_id).await.unwrap();
        assert_eq!(stored.zone, DEFAULT_ZONE);
    }

    #[tokio::test]
    async fn test_empty_stage_results_store_nothing() {
        let h = harness(
            vec![ok("{}"), ok("{}"), ok("{}")],
            FixedGeocoder::address("unused"),
        )
        .await;

        let result = h
            .service
            .submit(IntakeSubmission {
                image: image(),
                description: Some("open drain near school".to_string()),
                location_text: Some("Secunderabad".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(
            result,
            Err(AppError::Upstream { stage: "Image analysis", .. })
        ));
        assert_eq!(h.model.call_count(), 1);
        assert!(h.complaints.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_report_stores_nothing() {
        let h = harness(
            vec![ok(IMAGE_REPLY), ok(TEXT_REPLY), ok("```json\n{}\n```")],
            FixedGeocoder::address("unused"),
        )
        .await;

        let result = h
            .service
            .submit(IntakeSubmission {
                image: image(),
                description: Some("pothole".to_string()),
                location_text: Some("Uppal".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(
            result,
            Err(AppError::Upstream { stage: "Report generation", .. })
        ));
        assert_eq!(h.model.call_count(), 3);
        assert!(h.complaints.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_no_complaint() {
        let h = harness(
            vec![ok(IMAGE_REPLY), ok(TEXT_REPLY), ok(REPORT_REPLY)],
            FixedGeocoder::address("unused"),
        )
        .await;
        h.db.execute(
            "CREATE TRIGGER reject_complaints BEFORE INSERT ON complaints \
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END",
            &[],
        )
        .await
        .unwrap();

        let result = h
            .service
            .submit(IntakeSubmission {
                image: image(),
                description: Some("pothole".to_string()),
                location_text: Some("Uppal".to_string()),
                ..Default::default()
            })
            .await;

        let error = result.unwrap_err();
        assert!(matches!(error, AppError::Database(_)));
        assert_eq!(
            axum::response::IntoResponse::into_response(error).status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(h.complaints.list_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_merge_falls_back_to_other() {
        let (category, priority) =
            merge_classification(&ImageAnalysis::default(), &TextAnalysis::default());
        assert_eq!(category, ComplaintCategory::Other);
        assert_eq!(priority, Priority::Medium);
    }

    #[tokio::test]
    async fn test_submit_detached_returns_pipeline_result() {
        let h = harness(
            vec![ok(IMAGE_REPLY), ok(TEXT_REPLY), ok(REPORT_REPLY)],
            FixedGeocoder::failing(),
        )
        .await;
        let complaints = h.complaints.clone();
        let service = Arc::new(h.service);

        let ack = service
            .submit_detached(IntakeSubmission {
                image: image(),
                description: Some("pothole".to_string()),
                device_latitude: Some("17.385".to_string()),
                device_longitude: Some("78.4867".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let stored = complaints.get(ack.complaint_id).await.unwrap();
        assert_eq!(stored.location, "Geocoding failed. Lat/Lng: (17.3850, 78.4867)");
    }
}
