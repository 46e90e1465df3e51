//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, headers)
//!     → table.rs (snapshot of the published routes)
//!     → matcher.rs (first reachable route whose prefix matches)
//!     → router.rs (credentials, target selection)
//!     → Return: Dispatch or NoRoute / Unauthorized
//!
//! Hot reload:
//!     config::watcher publishes a new Vec<Route>
//!     → table.rs swaps it in whole
//! ```
//!
//! # Design Decisions
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same table and path always match the same route
//! - First match wins, in configured order

pub mod matcher;
pub mod router;
pub mod table;

pub use router::{Dispatch, Router};
pub use table::RouteTable;
