use astral_core::{CourseId, InstitutionId, RecordId};

use crate::{Period, RecordCertification, RecordLock, RecordType};

/// Read paths the lifecycle guard needs.
///
/// Implementations must answer from the same snapshot the protected write
/// will be applied to. Certification rows are returned in append order.
pub trait ComplianceLedger {
    /// Locks by (course, period), active or not.
    fn locks_for(&self, institution_id: InstitutionId, course_id: CourseId, period: Period) -> Vec<RecordLock>;

    /// Certifications by (record type, record id).
    fn certifications_for_record(&self, record_type: RecordType, record_id: RecordId) -> Vec<RecordCertification>;

    /// Period-scoped certifications for (course, period).
    fn certifications_for_period(
        &self,
        institution_id: InstitutionId,
        course_id: CourseId,
        period: Period,
    ) -> Vec<RecordCertification>;
}
