pub mod activity_log;
pub mod resident;

pub use activity_log::{ActivityLog, DeliveryStatus, NewActivityLog};
pub use resident::{Resident, ResidentInput, ResidentUpdate};
