//! # ferry-audit
//!
//! Audit logging for ferry migration runs.
//!
//! Every run writes its own file, truncated and initialized with the header
//! `timestamp,data`. Each subsequent line is an ISO-8601 timestamp, a comma,
//! and a JSON object carrying at least `status` and `action`:
//!
//! ```text
//! timestamp,data
//! 2025-03-01T10:15:02.114Z,{"status":"WARNING","action":"CREATE_USER","record_id":"2","email":"b@x.com","message":"Using email as username - no phone number"}
//! 2025-03-01T10:15:02.180Z,{"status":"SUCCESS","action":"CREATE_USER","record_id":"2","email":"b@x.com","identity_ref":"7c1e..."}
//! ```
//!
//! ## Actions
//!
//! | Action | Written by |
//! |--------|------------|
//! | `CREATE_USER` | identity creation (success, username fallback, rejection) |
//! | `ASSIGN_ROLE` | role resolution and role-mapping failures |
//! | `SET_PASSWORD` | temporary password issuance |
//! | `UPDATE_DB` | mapping write failures |
//! | `CREATE_ROLE` | role creation |
//! | `MIGRATION` | run-level failures |
//!
//! Recording never fails: sinks report write errors through `tracing` and
//! carry on, so a full disk cannot abort a half-finished batch.

pub mod entry;
pub mod error;
pub mod reader;
pub mod sink;

pub use entry::{
    AuditAction, AuditEntry, AuditEvent, AuditStatus, MappingDetail, PasswordDetail,
    RoleCreationDetail, RoleDetail, RunDetail, UserDetail,
};
pub use error::AuditError;
pub use reader::{migrated_record_ids, read_entries};
pub use sink::{AuditSink, CsvAuditLog, MemoryAuditSink};
