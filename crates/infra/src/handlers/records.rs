use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use astral_auth::{Identity, TenancyOptions};
use astral_core::{CourseId, RecordId, find_by_id_mut};
use astral_libro::{ComplianceRecord, Period, RecordBody, RecordState, RecordType, record_state};

use super::load_record;
use crate::operations::{OperationError, OperationResult, Operations};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateRecord {
    pub course_id: CourseId,
    pub date: NaiveDate,
    pub body: RecordBody,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateRecord {
    pub record_id: RecordId,
    pub body: RecordBody,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CourseRecordsFilter {
    #[serde(default)]
    pub period: Option<Period>,
    #[serde(default)]
    pub record_type: Option<RecordType>,
}

/// A record together with its derived lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    pub record: ComplianceRecord,
    pub state: RecordState,
}

impl Operations {
    pub fn create_record(&self, identity: Option<&Identity>, args: CreateRecord) -> OperationResult<RecordView> {
        self.tenant_mutation(
            "create_record",
            identity,
            &TenancyOptions::members(),
            args,
            |tx, args, tenancy| {
                let period = tx.calendar.period_of(args.date);
                let record = ComplianceRecord::new(
                    tenancy.institution_id(),
                    args.course_id,
                    args.date,
                    period,
                    tenancy.user_id(),
                    args.body,
                    tx.now,
                )?;
                tx.guard().check_create(tenancy, &record)?;

                info!(
                    record_id = %record.id,
                    record_type = %record.record_type,
                    course_id = %record.course_id,
                    period = %record.period,
                    "record created"
                );
                tx.tables.records.push(record.clone());
                let state = record_state(&*tx.tables, &record);
                Ok(RecordView { record, state })
            },
        )
    }

    /// Replace the body of a record. The record type is fixed at creation.
    pub fn update_record(&self, identity: Option<&Identity>, args: UpdateRecord) -> OperationResult<RecordView> {
        self.tenant_mutation(
            "update_record",
            identity,
            &TenancyOptions::members(),
            args,
            |tx, args, tenancy| {
                let current = load_record(tx.tables, tenancy, args.record_id)?;
                tx.guard().check_write(tenancy, &current)?;

                let record = find_by_id_mut(&mut tx.tables.records, args.record_id)
                    .ok_or(OperationError::not_found("record"))?;
                record.replace_body(args.body, tx.now)?;
                let record = record.clone();

                info!(record_id = %record.id, "record updated");
                let state = record_state(&*tx.tables, &record);
                Ok(RecordView { record, state })
            },
        )
    }

    pub fn get_record(&self, identity: Option<&Identity>, record_id: RecordId) -> OperationResult<RecordView> {
        self.tenant_query(
            "get_record",
            identity,
            &TenancyOptions::members(),
            record_id,
            |q, record_id, tenancy| {
                let record = load_record(q.tables, tenancy, record_id)?;
                let state = q.guard().state(&record);
                Ok(RecordView { record, state })
            },
        )
    }

    /// Records of one course, oldest date first.
    pub fn list_course_records(
        &self,
        identity: Option<&Identity>,
        course_id: CourseId,
        filter: CourseRecordsFilter,
    ) -> OperationResult<Vec<RecordView>> {
        self.tenant_query(
            "list_course_records",
            identity,
            &TenancyOptions::members(),
            (course_id, filter),
            |q, (course_id, filter), tenancy| {
                let guard = q.guard();
                let mut views: Vec<RecordView> = q
                    .tables
                    .course_records(tenancy.institution_id(), course_id, filter.period)
                    .into_iter()
                    .filter(|r| filter.record_type.is_none_or(|t| r.record_type == t))
                    .map(|r| RecordView {
                        record: r.clone(),
                        state: guard.state(r),
                    })
                    .collect();
                views.sort_by_key(|v| (v.record.date, v.record.created_at));
                Ok(views)
            },
        )
    }
}
