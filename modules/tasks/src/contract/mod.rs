pub mod context;
pub mod error;
pub mod messages;
pub mod model;

pub use context::CallMeta;
pub use error::{RpcCode, RpcError};
pub use model::{ListQuery, Pagination, SortField, SortOrder, StatusFilter, Task, TaskPage};
