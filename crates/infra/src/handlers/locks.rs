use serde::Deserialize;
use tracing::{debug, info};

use astral_auth::{Identity, Role, TenancyOptions};
use astral_core::{CourseId, LockId, find_by_id_mut};
use astral_libro::{LockTarget, Period, RecordLock};

use crate::operations::{OperationError, OperationResult, Operations};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LockScope {
    pub course_id: CourseId,
    pub period: Period,
    pub target: LockTarget,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LocksFilter {
    #[serde(default)]
    pub period: Option<Period>,
    #[serde(default)]
    pub active_only: bool,
}

impl Operations {
    /// Freeze a (course, period, target) scope. Locking an already locked
    /// scope returns the existing lock.
    pub fn lock_scope(&self, identity: Option<&Identity>, args: LockScope) -> OperationResult<RecordLock> {
        self.tenant_mutation(
            "lock_scope",
            identity,
            &TenancyOptions::roles(Role::ADMINISTRATIVE),
            args,
            |tx, args, tenancy| {
                if let Some(existing) = tx.tables.locks.iter().find(|l| {
                    l.is_locked
                        && l.institution_id == tenancy.institution_id()
                        && l.course_id == args.course_id
                        && l.period == args.period
                        && l.target == args.target
                }) {
                    debug!(lock_id = %existing.id, "scope already locked");
                    return Ok(existing.clone());
                }

                let lock = RecordLock::lock(
                    tenancy.institution_id(),
                    args.course_id,
                    args.period,
                    args.target,
                    tenancy.user_id(),
                    tx.now,
                    args.reason,
                );
                info!(
                    lock_id = %lock.id,
                    course_id = %lock.course_id,
                    period = %lock.period,
                    target = %lock.target,
                    "scope locked"
                );
                tx.tables.locks.push(lock.clone());
                Ok(lock)
            },
        )
    }

    pub fn unlock(&self, identity: Option<&Identity>, lock_id: LockId) -> OperationResult<RecordLock> {
        self.tenant_mutation(
            "unlock",
            identity,
            &TenancyOptions::roles(Role::ADMINISTRATIVE),
            lock_id,
            |tx, lock_id, tenancy| {
                let lock = find_by_id_mut(&mut tx.tables.locks, lock_id)
                    .filter(|l| l.institution_id == tenancy.institution_id())
                    .ok_or(OperationError::not_found("lock"))?;
                lock.unlock(tenancy.user_id(), tx.now)?;

                info!(lock_id = %lock.id, "scope unlocked");
                Ok(lock.clone())
            },
        )
    }

    /// Locks of a course, newest first.
    pub fn list_locks(
        &self,
        identity: Option<&Identity>,
        course_id: CourseId,
        filter: LocksFilter,
    ) -> OperationResult<Vec<RecordLock>> {
        self.tenant_query(
            "list_locks",
            identity,
            &TenancyOptions::members(),
            (course_id, filter),
            |q, (course_id, filter), tenancy| {
                let mut locks: Vec<RecordLock> = q
                    .tables
                    .locks
                    .iter()
                    .filter(|l| {
                        l.institution_id == tenancy.institution_id()
                            && l.course_id == course_id
                            && filter.period.is_none_or(|p| l.period == p)
                            && (!filter.active_only || l.is_locked)
                    })
                    .cloned()
                    .collect();
                locks.sort_by(|a, b| b.locked_at.cmp(&a.locked_at));
                Ok(locks)
            },
        )
    }
}
