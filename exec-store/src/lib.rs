mod clock;
mod error;
mod memory;
mod page;
mod record;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use page::{paginate, Cursor, Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use record::{
    CallerIdentity, ExecutionId, ExecutionRecord, NewExecution, Snippet, SnippetId, StarRecord,
};
pub use traits::{EntitlementStore, ExecutionStore, SnippetLookup, StarStore};
