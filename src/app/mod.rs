pub mod context;
pub mod error;
pub mod session;

pub use context::AppContext;
pub use error::{FeedError, Result};
pub use session::{FeedSession, LoadOutcome};
