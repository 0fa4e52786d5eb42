use serde::Deserialize;
use tracing::{debug, info};

use astral_auth::{Identity, TenancyOptions, ensure_administrator};
use astral_core::{RecordId, SignatureId, find_by_id, find_by_id_mut};
use astral_libro::{DigitalSignature, LockTarget, SignatureRequest};

use super::load_record;
use crate::operations::{OperationError, OperationResult, Operations};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignRecord {
    pub record_id: RecordId,
    #[serde(flatten)]
    pub request: SignatureRequest,
}

impl Operations {
    /// Append a signature for the record's author and mark the record signed.
    ///
    /// Signature rows are never updated or deleted; a second signature adds a
    /// row and leaves `signed_at` at the first one.
    pub fn sign_record(&self, identity: Option<&Identity>, args: SignRecord) -> OperationResult<DigitalSignature> {
        self.tenant_mutation(
            "sign_record",
            identity,
            &TenancyOptions::members(),
            args,
            |tx, args, tenancy| {
                let record = load_record(tx.tables, tenancy, args.record_id)?;
                tx.guard().check_sign(tenancy, &record)?;

                let signature = DigitalSignature::record(
                    tenancy.institution_id(),
                    record.record_type,
                    record.id,
                    tenancy.user_id(),
                    args.request,
                    tx.now,
                )?;
                tx.tables.signatures.push(signature.clone());

                let first = find_by_id_mut(&mut tx.tables.records, record.id)
                    .ok_or(OperationError::not_found("record"))?
                    .mark_signed(signature.signed_at);

                info!(
                    record_id = %record.id,
                    signature_id = %signature.id,
                    method = ?signature.method,
                    first_signature = first,
                    "record signed"
                );
                Ok(signature)
            },
        )
    }

    /// Signatures of a record, in signing order.
    pub fn list_signatures(&self, identity: Option<&Identity>, record_id: RecordId) -> OperationResult<Vec<DigitalSignature>> {
        self.tenant_query(
            "list_signatures",
            identity,
            &TenancyOptions::members(),
            record_id,
            |q, record_id, tenancy| {
                let record = load_record(q.tables, tenancy, record_id)?;
                Ok(q.tables
                    .signatures_for(record.record_type, record.id)
                    .into_iter()
                    .cloned()
                    .collect())
            },
        )
    }

    /// Attach an administrator's certification to a signature. Repeating is a no-op;
    /// an active lock over the signed record refuses it.
    pub fn certify_signature(
        &self,
        identity: Option<&Identity>,
        signature_id: SignatureId,
    ) -> OperationResult<DigitalSignature> {
        self.tenant_mutation(
            "certify_signature",
            identity,
            &TenancyOptions::members(),
            signature_id,
            |tx, signature_id, tenancy| {
                let record_id = find_by_id(&tx.tables.signatures, signature_id)
                    .filter(|s| s.institution_id == tenancy.institution_id())
                    .map(|s| s.record_id)
                    .ok_or(OperationError::not_found("signature"))?;
                ensure_administrator(tenancy)?;

                let record = load_record(tx.tables, tenancy, record_id)?;
                tx.guard().ensure_unlocked(
                    tenancy,
                    record.course_id,
                    record.period,
                    LockTarget::Only(record.record_type),
                )?;

                let signature = find_by_id_mut(&mut tx.tables.signatures, signature_id)
                    .ok_or(OperationError::not_found("signature"))?;

                if signature.certify(tenancy.user_id(), tx.now) {
                    info!(signature_id = %signature.id, "signature certified");
                } else {
                    debug!(signature_id = %signature.id, "signature already certified");
                }
                Ok(signature.clone())
            },
        )
    }
}
