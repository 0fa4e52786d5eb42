//! `astral-core`: shared domain building blocks.
//!
//! Pure domain primitives only: identifiers, the domain error model, the
//! entity trait and the clock abstraction. No storage or transport concerns.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, SystemClock, local_date};
pub use entity::{Entity, find_by_id, find_by_id_mut};
pub use error::{DomainError, DomainResult};
pub use id::{
    CertificationId, CourseId, InstitutionId, LockId, MembershipId, RecordId, SignatureId,
    StudentId, UserId,
};
