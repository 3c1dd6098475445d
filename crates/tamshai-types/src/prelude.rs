pub use crate::confirm::{ConfirmationData, PendingConfirmation};
pub use crate::envelope::{
    PaginationMetadata, ResponseEnvelope, ResponseMetadata, TruncationMetadata,
};
pub use crate::id::{CorrelationId, Id};
pub use crate::identity::CallerIdentity;
pub use crate::outcome::{QueryOutcome, QueryStatus};
pub use crate::time::Timestamp;
