//! Digital signatures: append-only audit rows referencing a record.
//!
//! There is deliberately no update or delete API for signatures. The only
//! mutation is [`DigitalSignature::certify`], which fills the certification
//! fields once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use astral_core::{DomainError, Entity, InstitutionId, RecordId, SignatureId, UserId};

use crate::RecordType;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureMethod {
    Electronic,
    Biometric,
    Certificate,
}

/// Network/client details captured when signing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalSignature {
    pub id: SignatureId,
    pub institution_id: InstitutionId,
    pub record_type: RecordType,
    pub record_id: RecordId,
    pub signer_id: UserId,
    pub payload: String,
    pub method: SignatureMethod,
    pub signed_at: DateTime<Utc>,
    pub is_certified: bool,
    pub certified_by: Option<UserId>,
    pub certified_at: Option<DateTime<Utc>>,
    pub client: Option<ClientMetadata>,
}

/// Input for a new signature row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub payload: String,
    pub method: SignatureMethod,
    #[serde(default)]
    pub client: Option<ClientMetadata>,
}

impl DigitalSignature {
    pub fn record(
        institution_id: InstitutionId,
        record_type: RecordType,
        record_id: RecordId,
        signer_id: UserId,
        request: SignatureRequest,
        signed_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if request.payload.trim().is_empty() {
            return Err(DomainError::validation("signature payload cannot be empty"));
        }

        Ok(Self {
            id: SignatureId::new(),
            institution_id,
            record_type,
            record_id,
            signer_id,
            payload: request.payload,
            method: request.method,
            signed_at,
            is_certified: false,
            certified_by: None,
            certified_at: None,
            client: request.client,
        })
    }

    /// Attach the certifier once. Repeating is a successful no-op and returns `false`.
    pub fn certify(&mut self, certifier: UserId, at: DateTime<Utc>) -> bool {
        if self.is_certified {
            return false;
        }
        self.is_certified = true;
        self.certified_by = Some(certifier);
        self.certified_at = Some(at);
        true
    }
}

impl Entity for DigitalSignature {
    type Id = SignatureId;

    fn id(&self) -> SignatureId {
        self.id
    }
}
