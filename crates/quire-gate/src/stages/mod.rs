pub mod entry;
pub mod policy;
pub mod throttle;
pub mod validation;

pub use entry::{EntryStage, ExpirationStage};
pub use policy::{BannedIpStage, CommentsEnabledStage};
pub use throttle::ThrottleStage;
pub use validation::RequiredFieldsStage;
