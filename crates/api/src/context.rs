use astral_auth::Identity;

/// Session for a request, as established by the identity middleware.
///
/// `None` means no bearer token was presented; tenancy resolution turns that
/// into `authentication_required`. Institution and role are never taken from
/// the request; the resolver derives them per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}
