pub use crate::client::{ClientBuilder, HttpQueryClient, QueryClient};
pub use crate::errors::NetError;
pub use crate::metrics::{NetMetrics, NetMetricsSnapshot};
pub use crate::pagination::PageWalk;
pub use crate::policy::QueryPolicy;
pub use crate::types::{QueryRequest, ToolCall, ToolMethod, ToolResponse};
