pub mod dose_log;
pub mod enums;
pub mod medicine;
pub mod profile;
pub mod share;

pub use dose_log::DoseLog;
pub use enums::{DoseStatus, MedicineColor, NotificationKind, TimeSlot};
pub use medicine::{Medicine, NewMedicine, ValidationError};
pub use profile::{Profile, ProfileUpdate};
pub use share::CaretakerShare;
