// pulseboard-core: Decoding, reconciliation and view state between
// pulseboard-api and the terminal dashboard.

pub mod config;
pub mod decode;
pub mod diagnostics;
pub mod error;
pub mod highlight;
pub mod model;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod stream;
pub mod subscription;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_PAGE_SIZE, SessionConfig, TlsVerification};
pub use decode::decode;
pub use diagnostics::{ConnectionStatus, DiagnosticsSink, format_latency, latency_ms};
pub use error::CoreError;
pub use reconcile::{Outcome, ReconciliationEngine};
pub use session::{
    Alert, RecordSource, Session, SessionCommand, SessionCommands, SessionHandle,
};
pub use store::{ActivityFeed, DisplayedRow, FeedSnapshot, RecordTable, TableSnapshot};
pub use stream::ViewStream;
pub use subscription::{CommandSink, SubscriptionController, SubscriptionState};
pub use view::{FeedView, TableView};

// Re-export model types at the crate root for ergonomics.
pub use model::{Change, ChangeEvent, FeedEntry, Marking, Record, RecordId};

// Wire-level types consumers may need without depending on pulseboard-api.
pub use pulseboard_api::{Command, DecodeError, Error as ApiError, ReconnectConfig};
