mod audit_log_service;
mod complaint_service;
mod intake_service;
pub mod location_service;

pub use audit_log_service::AuditLogService;
pub use complaint_service::{ComplaintService, StoredComplaint};
pub use intake_service::{IntakeService, IntakeSubmission, Upload};
pub use location_service::{
    LocationInput, LocationService, NominatimGeocoder, ResolvedLocation, ReverseGeocoder,
};
