//! Role resolution and row-level access control
//!
//! Every request is served on behalf of a [`Principal`]. The principal's
//! [`Role`] decides which write operations are allowed ([`policy`]) and
//! which rows are visible ([`AccessScope`]).

pub mod policy;
pub mod role;
pub mod scope;

pub use policy::{Action, ReportAudience};
pub use role::{resolve_role, Principal, Role};
pub use scope::{AccessScope, ScopedEntity};
