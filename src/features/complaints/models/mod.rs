mod complaint;
mod status_history;

pub use complaint::{Complaint, ComplaintCategory, ComplaintStatus, NewComplaint, Priority};
pub use status_history::StatusHistoryEntry;
