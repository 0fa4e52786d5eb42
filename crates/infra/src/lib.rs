//! Infrastructure layer: document store, operation surface and handlers.

pub mod handlers;
pub mod operations;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use handlers::certifications::{CertifyPeriod, CertifyRecord, ReviewCertification};
pub use handlers::locks::{LockScope, LocksFilter};
pub use handlers::memberships::{InviteMember, MemberView, RegisterInstitution, RegisterUser, SetUserActive};
pub use handlers::records::{CourseRecordsFilter, CreateRecord, RecordView, UpdateRecord};
pub use handlers::signatures::SignRecord;
pub use operations::{
    MutationCtx, OperationError, OperationResult, OperationSettings, Operations, QueryCtx,
};
pub use store::{Database, StoreError, Tables};
