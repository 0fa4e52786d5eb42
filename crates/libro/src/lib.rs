//! `astral-libro`: the digital Libro de Clases compliance model.
//!
//! Records move OPEN -> SIGNED -> CERTIFIED, with administrative locks able to
//! freeze any scope at any point. This crate holds the entities and the pure
//! lifecycle guard; persistence plugs in through [`ComplianceLedger`].

pub mod certification;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod lock;
pub mod period;
pub mod record;
pub mod signature;

pub use certification::{
    CertificationScope, CertificationStatus, CertificationType, RecordCertification,
    effective_rows, find_effective_certification,
};
pub use error::{LifecycleError, LifecycleResult};
pub use guard::{LifecycleGuard, RecordState, certification_covering, record_state};
pub use ledger::ComplianceLedger;
pub use lock::RecordLock;
pub use period::{AcademicCalendar, Period};
pub use record::{
    AttendanceStatus, ComplianceRecord, LockTarget, ObservationKind, RecordBody, RecordType,
};
pub use signature::{ClientMetadata, DigitalSignature, SignatureMethod, SignatureRequest};
