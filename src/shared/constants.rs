/// Prefix of the citizen-facing complaint identifier, followed by epoch seconds
pub const GHMC_ID_PREFIX: &str = "GHMC/HYD/";

/// Subject stored when the synthesized report has none
pub const DEFAULT_SUBJECT: &str = "Untitled Complaint";

/// Zone stored when the synthesized report has none
pub const DEFAULT_ZONE: &str = "Unknown";

pub const DEFAULT_SUBMITTED_BY: &str = "Citizen";

/// Actor recorded on admin status changes when the request names none
pub const DEFAULT_CHANGED_BY: &str = "Admin";

/// Pseudo-status recorded in the audit trail when a complaint is removed
pub const DELETED_STATUS: &str = "Deleted";

/// Transcription used when the audio stage fails or returns nothing
pub const AUDIO_FALLBACK_TRANSCRIPTION: &str =
    "Demonstration fallback: Could not process audio file via API.";

pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";
pub const DEFAULT_AUDIO_MIME_TYPE: &str = "audio/webm";

/// Fixed complaint categories, in the order they are offered to the model
pub const COMPLAINT_CATEGORIES: [&str; 8] = [
    "Open Garbage Dump",
    "Sewage Leak/Overflow",
    "Pothole/Damaged Road",
    "Damaged Electrical Infrastructure",
    "Fallen Tree",
    "Water Logging",
    "Stray Animals",
    "Other",
];
