//! End-to-end tests through the operation surface.
//!
//! Tests: identity → resolver → role gate → lifecycle guard → store
//!
//! Verifies:
//! - Tenant isolation and information hiding across institutions
//! - Lock and certification precedence over every record mutation
//! - Rejected operations leave no partial writes

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;

    use astral_auth::{GlobalRole, Identity, MembershipRole, MembershipStatus, Role, TenancyOptions};
    use astral_core::{Clock, CourseId, InstitutionId, StudentId};
    use astral_libro::{
        AttendanceStatus, CertificationScope, CertificationStatus, CertificationType,
        ComplianceRecord, LockTarget, Period, RecordBody, RecordState, RecordType,
        SignatureMethod, SignatureRequest,
    };

    use crate::{
        CertifyPeriod, CertifyRecord, CourseRecordsFilter, CreateRecord, Database, InviteMember,
        LockScope, OperationError, OperationResult, OperationSettings, Operations,
        RegisterInstitution, RegisterUser, ReviewCertification, SetUserActive, SignRecord,
        StoreError, UpdateRecord,
    };

    /// Advances one minute per reading, starting 2025-06-01 12:00 UTC (08:00 in Santiago).
    struct SteppingClock(Mutex<DateTime<Utc>>);

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut now = self.0.lock().unwrap();
            let current = *now;
            *now = current + Duration::minutes(1);
            current
        }
    }

    struct School {
        ops: Operations,
        institution: InstitutionId,
        admin: Identity,
        profesor: Identity,
        parent: Identity,
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn operations() -> Operations {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        Operations::new(
            Arc::new(Database::new()),
            Arc::new(SteppingClock(Mutex::new(start))),
            OperationSettings::default(),
        )
    }

    fn register(ops: &Operations, subject: &str) -> Identity {
        let identity = Identity::new(format!("auth|{subject}"));
        ops.register_user(
            Some(&identity),
            RegisterUser {
                display_name: subject.to_string(),
                email: Some(format!("{subject}@liceo.cl")),
            },
        )
        .unwrap();
        identity
    }

    fn join(ops: &Operations, admin: &Identity, institution: InstitutionId, subject: &str, role: MembershipRole) -> Identity {
        let identity = register(ops, subject);
        ops.invite_member(
            Some(admin),
            InviteMember {
                email: format!("{subject}@liceo.cl"),
                role,
            },
        )
        .unwrap();
        ops.accept_invitation(Some(&identity), institution).unwrap();
        identity
    }

    fn school_in(ops: Operations, prefix: &str) -> School {
        let admin = register(&ops, &format!("{prefix}-admin"));
        let institution = ops
            .register_institution(
                Some(&admin),
                RegisterInstitution {
                    name: format!("Liceo {prefix}"),
                    rbd: Some("8833".to_string()),
                },
            )
            .unwrap()
            .id;
        let profesor = join(&ops, &admin, institution, &format!("{prefix}-profesor"), MembershipRole::Profesor);
        let parent = join(&ops, &admin, institution, &format!("{prefix}-apoderado"), MembershipRole::Parent);
        School {
            ops,
            institution,
            admin,
            profesor,
            parent,
        }
    }

    fn school() -> School {
        school_in(operations(), "norte")
    }

    fn promote_to_master(ops: &Operations, subject: &str) -> Identity {
        let identity = register(ops, subject);
        ops.database()
            .transaction::<_, StoreError>(|t| {
                let user = t
                    .users
                    .iter_mut()
                    .find(|u| u.external_id == identity.subject)
                    .unwrap();
                user.global_role = GlobalRole::Master;
                Ok(())
            })
            .unwrap();
        identity
    }

    fn content(text: &str) -> RecordBody {
        RecordBody::ClassContent {
            content: text.to_string(),
            objectives: vec!["OA1".to_string()],
        }
    }

    fn attendance() -> RecordBody {
        RecordBody::Attendance {
            student_id: StudentId::new(),
            status: AttendanceStatus::Present,
        }
    }

    fn create(s: &School, who: &Identity, course: CourseId, date: NaiveDate, body: RecordBody) -> OperationResult<ComplianceRecord> {
        s.ops
            .create_record(
                Some(who),
                CreateRecord {
                    course_id: course,
                    date,
                    body,
                },
            )
            .map(|v| v.record)
    }

    fn sign(s: &School, who: &Identity, record: &ComplianceRecord) -> OperationResult<astral_libro::DigitalSignature> {
        s.ops.sign_record(
            Some(who),
            SignRecord {
                record_id: record.id,
                request: SignatureRequest {
                    payload: format!("firma:{}", record.id),
                    method: SignatureMethod::Electronic,
                    client: None,
                },
            },
        )
    }

    fn certify(s: &School, who: &Identity, record: &ComplianceRecord) -> OperationResult<astral_libro::RecordCertification> {
        s.ops.certify_record(
            Some(who),
            CertifyRecord {
                record_id: record.id,
                certification_type: CertificationType::Daily,
                notes: None,
            },
        )
    }

    fn edit(s: &School, who: &Identity, record: &ComplianceRecord, text: &str) -> OperationResult<ComplianceRecord> {
        s.ops
            .update_record(
                Some(who),
                UpdateRecord {
                    record_id: record.id,
                    body: content(text),
                },
            )
            .map(|v| v.record)
    }

    fn state(s: &School, record: &ComplianceRecord) -> RecordState {
        s.ops.get_record(Some(&s.admin), record.id).unwrap().state
    }

    fn code<T: std::fmt::Debug>(result: OperationResult<T>) -> &'static str {
        result.unwrap_err().code()
    }

    fn current_period() -> Period {
        Period::new(2025, 1).unwrap()
    }

    #[test]
    fn profesor_signs_admin_certifies_then_lock_blocks_new_work() {
        let s = school();
        let course = CourseId::new();

        let record = create(&s, &s.profesor, course, today(), content("Fracciones")).unwrap();
        assert_eq!(state(&s, &record), RecordState::Open);
        assert_eq!(record.period, current_period());

        sign(&s, &s.profesor, &record).unwrap();
        assert_eq!(state(&s, &record), RecordState::Signed);
        assert_eq!(s.ops.list_signatures(Some(&s.profesor), record.id).unwrap().len(), 1);
        assert!(s.ops.get_record(Some(&s.profesor), record.id).unwrap().record.is_signed);

        certify(&s, &s.admin, &record).unwrap();
        assert_eq!(state(&s, &record), RecordState::Certified);
        assert_eq!(code(edit(&s, &s.profesor, &record, "Decimales")), "record_certified");

        s.ops
            .lock_scope(
                Some(&s.admin),
                LockScope {
                    course_id: course,
                    period: current_period(),
                    target: LockTarget::All,
                    reason: Some("cierre de semestre".to_string()),
                },
            )
            .unwrap();
        assert_eq!(
            code(create(&s, &s.profesor, course, today(), content("Geometría"))),
            "record_locked"
        );
    }

    #[test]
    fn lock_blocks_sign_and_certify_on_records_created_before_it() {
        let s = school();
        let course = CourseId::new();
        let record = create(&s, &s.profesor, course, today(), content("Ecuaciones")).unwrap();

        let lock = s
            .ops
            .lock_scope(
                Some(&s.admin),
                LockScope {
                    course_id: course,
                    period: current_period(),
                    target: LockTarget::All,
                    reason: None,
                },
            )
            .unwrap();

        assert_eq!(state(&s, &record), RecordState::Locked);
        assert_eq!(code(sign(&s, &s.profesor, &record)), "record_locked");
        assert_eq!(code(edit(&s, &s.profesor, &record, "x")), "record_locked");
        assert_eq!(code(edit(&s, &s.admin, &record, "x")), "record_locked");
        assert_eq!(code(certify(&s, &s.admin, &record)), "record_locked");

        let unlocked = s.ops.unlock(Some(&s.admin), lock.id).unwrap();
        assert!(!unlocked.is_locked);
        assert!(unlocked.unlocked_by.is_some());
        assert_eq!(code(s.ops.unlock(Some(&s.admin), lock.id)), "invariant_violation");

        sign(&s, &s.profesor, &record).unwrap();
        certify(&s, &s.admin, &record).unwrap();
    }

    #[test]
    fn lock_blocks_signature_certification() {
        let s = school();
        let course = CourseId::new();
        let record = create(&s, &s.profesor, course, today(), content("Ecuaciones")).unwrap();
        let signature = sign(&s, &s.profesor, &record).unwrap();

        let lock = s
            .ops
            .lock_scope(
                Some(&s.admin),
                LockScope {
                    course_id: course,
                    period: current_period(),
                    target: LockTarget::All,
                    reason: None,
                },
            )
            .unwrap();

        assert_eq!(code(s.ops.certify_signature(Some(&s.admin), signature.id)), "record_locked");
        let stored = s.ops.list_signatures(Some(&s.admin), record.id).unwrap();
        assert!(!stored[0].is_certified);

        s.ops.unlock(Some(&s.admin), lock.id).unwrap();
        let certified = s.ops.certify_signature(Some(&s.admin), signature.id).unwrap();
        assert!(certified.is_certified);
    }

    #[test]
    fn locking_twice_returns_the_existing_lock() {
        let s = school();
        let args = LockScope {
            course_id: CourseId::new(),
            period: current_period(),
            target: LockTarget::Only(RecordType::Grade),
            reason: None,
        };
        let first = s.ops.lock_scope(Some(&s.admin), args.clone()).unwrap();
        let second = s.ops.lock_scope(Some(&s.admin), args.clone()).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(code(s.ops.lock_scope(Some(&s.profesor), args)), "insufficient_role");
    }

    #[test]
    fn grade_lock_leaves_attendance_writable() {
        let s = school();
        let course = CourseId::new();
        s.ops
            .lock_scope(
                Some(&s.admin),
                LockScope {
                    course_id: course,
                    period: current_period(),
                    target: LockTarget::Only(RecordType::Grade),
                    reason: None,
                },
            )
            .unwrap();

        assert!(create(&s, &s.profesor, course, today(), attendance()).is_ok());
        let grade = RecordBody::Grade {
            student_id: StudentId::new(),
            evaluation: "Prueba 1".to_string(),
            value: 6.5,
        };
        assert_eq!(code(create(&s, &s.profesor, course, today(), grade)), "record_locked");
    }

    #[test]
    fn other_institution_sees_nothing() {
        let ops = operations();
        let home = school_in(ops.clone(), "norte");
        let away = school_in(ops, "sur");
        let course = CourseId::new();

        let mut record = create(&home, &home.profesor, course, today(), content("Historia")).unwrap();

        for who in [&away.admin, &away.profesor, &away.parent] {
            assert_eq!(
                away.ops.get_record(Some(who), record.id).unwrap_err(),
                OperationError::NotFound("record")
            );
            assert_eq!(code(edit(&away, who, &record, "x")), "not_found");
            assert_eq!(code(sign(&away, who, &record)), "not_found");
            assert_eq!(code(away.ops.list_signatures(Some(who), record.id)), "not_found");
        }

        sign(&home, &home.profesor, &record).unwrap();
        record.is_signed = true;
        assert_eq!(code(certify(&away, &away.admin, &record)), "not_found");
        assert!(away
            .ops
            .list_course_records(Some(&away.admin), course, CourseRecordsFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn second_signature_appends_row_but_keeps_first_timestamp() {
        let s = school();
        let record = create(&s, &s.profesor, CourseId::new(), today(), attendance()).unwrap();

        let first = sign(&s, &s.profesor, &record).unwrap();
        let second = sign(&s, &s.profesor, &record).unwrap();
        assert_ne!(first.id, second.id);
        assert!(second.signed_at > first.signed_at);

        let stored = s.ops.get_record(Some(&s.profesor), record.id).unwrap().record;
        assert_eq!(stored.signed_at, Some(first.signed_at));
        assert_eq!(s.ops.list_signatures(Some(&s.admin), record.id).unwrap().len(), 2);
    }

    #[test]
    fn only_the_author_signs() {
        let s = school();
        let colleague = join(&s.ops, &s.admin, s.institution, "colega", MembershipRole::Profesor);
        let record = create(&s, &s.profesor, CourseId::new(), today(), attendance()).unwrap();

        assert_eq!(code(sign(&s, &colleague, &record)), "insufficient_role");
        assert_eq!(code(sign(&s, &s.admin, &record)), "insufficient_role");
        assert_eq!(code(edit(&s, &colleague, &record, "x")), "insufficient_role");
    }

    #[test]
    fn future_dates_are_rejected_without_side_effects() {
        let s = school();
        let course = CourseId::new();
        let tomorrow = today().succ_opt().unwrap();

        assert_eq!(code(create(&s, &s.profesor, course, tomorrow, attendance())), "future_date");
        assert_eq!(s.ops.database().read(|t| t.records.len()).unwrap(), 0);

        create(&s, &s.profesor, course, today(), attendance()).unwrap();
        create(&s, &s.profesor, course, today().pred_opt().unwrap(), attendance()).unwrap();
        assert_eq!(s.ops.database().read(|t| t.records.len()).unwrap(), 2);
    }

    #[test]
    fn certification_requires_signature() {
        let s = school();
        let record = create(&s, &s.profesor, CourseId::new(), today(), attendance()).unwrap();

        assert_eq!(code(certify(&s, &s.admin, &record)), "certification_requires_signature");
        assert_eq!(code(certify(&s, &s.profesor, &record)), "insufficient_role");
        assert!(s.ops.database().read(|t| t.certifications.is_empty()).unwrap());
    }

    #[test]
    fn period_certification_freezes_every_covered_record() {
        let s = school();
        let course = CourseId::new();
        let a = create(&s, &s.profesor, course, today(), content("Unidad 1")).unwrap();
        let b = create(&s, &s.profesor, course, today(), content("Unidad 2")).unwrap();
        sign(&s, &s.profesor, &a).unwrap();

        let args = CertifyPeriod {
            course_id: course,
            period: current_period(),
            target: LockTarget::Only(RecordType::ClassContent),
            notes: None,
        };
        assert_eq!(
            code(s.ops.certify_period(Some(&s.admin), args.clone())),
            "certification_requires_signature"
        );

        sign(&s, &s.profesor, &b).unwrap();
        s.ops.certify_period(Some(&s.admin), args.clone()).unwrap();

        assert_eq!(state(&s, &a), RecordState::Certified);
        assert_eq!(code(edit(&s, &s.profesor, &b, "x")), "record_certified");
        assert_eq!(code(create(&s, &s.profesor, course, today(), content("Unidad 3"))), "record_certified");
        assert!(create(&s, &s.profesor, course, today(), attendance()).is_ok());
        assert_eq!(code(s.ops.certify_period(Some(&s.admin), args)), "record_certified");
    }

    #[test]
    fn reopening_appends_an_audited_row_and_unfreezes() {
        let s = school();
        let record = create(&s, &s.profesor, CourseId::new(), today(), content("Lectura")).unwrap();
        sign(&s, &s.profesor, &record).unwrap();
        certify(&s, &s.admin, &record).unwrap();

        let scope = CertificationScope::Record {
            record_type: record.record_type,
            record_id: record.id,
        };
        let without_notes = ReviewCertification { scope, notes: Some("  ".to_string()) };
        assert_eq!(code(s.ops.reopen_certification(Some(&s.admin), without_notes)), "validation_error");

        let reopen = ReviewCertification {
            scope,
            notes: Some("error en objetivos".to_string()),
        };
        assert_eq!(code(s.ops.reopen_certification(Some(&s.profesor), reopen.clone())), "insufficient_role");
        let row = s.ops.reopen_certification(Some(&s.admin), reopen.clone()).unwrap();
        assert_eq!(row.status, CertificationStatus::Reopened);

        assert_eq!(state(&s, &record), RecordState::Signed);
        edit(&s, &s.profesor, &record, "Lectura comprensiva").unwrap();

        let history = s.ops.list_certifications(Some(&s.profesor), scope).unwrap();
        let statuses: Vec<_> = history.iter().map(|c| c.status).collect();
        assert_eq!(statuses, vec![CertificationStatus::Certified, CertificationStatus::Reopened]);

        assert_eq!(code(s.ops.reopen_certification(Some(&s.admin), reopen)), "conflict");
    }

    #[test]
    fn pending_request_can_be_rejected_then_certified() {
        let s = school();
        let record = create(&s, &s.profesor, CourseId::new(), today(), attendance()).unwrap();
        let request = CertifyRecord {
            record_id: record.id,
            certification_type: CertificationType::Weekly,
            notes: None,
        };
        assert_eq!(
            code(s.ops.request_certification(Some(&s.profesor), request.clone())),
            "certification_requires_signature"
        );

        sign(&s, &s.profesor, &record).unwrap();
        let pending = s.ops.request_certification(Some(&s.profesor), request.clone()).unwrap();
        let again = s.ops.request_certification(Some(&s.profesor), request).unwrap();
        assert_eq!(pending.id, again.id);
        assert_eq!(state(&s, &record), RecordState::Signed);

        let review = ReviewCertification {
            scope: pending.scope,
            notes: Some("falta detalle".to_string()),
        };
        let rejected = s.ops.reject_certification(Some(&s.admin), review.clone()).unwrap();
        assert_eq!(rejected.status, CertificationStatus::Rejected);
        assert_eq!(rejected.certification_type, CertificationType::Weekly);
        assert_eq!(code(s.ops.reject_certification(Some(&s.admin), review)), "conflict");

        certify(&s, &s.admin, &record).unwrap();
        assert_eq!(state(&s, &record), RecordState::Certified);
    }

    #[test]
    fn parent_is_rejected_but_master_override_passes() {
        let s = school();
        let master = promote_to_master(&s.ops, "superintendencia");
        s.ops.switch_institution(Some(&master), s.institution).unwrap();

        let options = TenancyOptions::roles([Role::Admin, Role::Profesor, Role::Master]);
        let run = |who: &Identity| {
            s.ops
                .tenant_mutation("probe", Some(who), &options, (), |_, (), tenancy| Ok(tenancy.membership_role))
        };
        assert_eq!(code(run(&s.parent)), "insufficient_role");
        assert_eq!(run(&master).unwrap(), Role::Master);

        let without_master = TenancyOptions::roles([Role::Admin, Role::Profesor]);
        assert_eq!(
            code(s.ops.tenant_mutation("probe", Some(&master), &without_master, (), |_, (), _| Ok(()))),
            "insufficient_role"
        );

        assert_eq!(code(create(&s, &s.parent, CourseId::new(), today(), attendance())), "insufficient_role");
        assert!(create(&s, &master, CourseId::new(), today(), attendance()).is_ok());
    }

    #[test]
    fn pending_invitation_grants_no_access() {
        let s = school();
        let invitee = register(&s.ops, "nuevo");
        s.ops
            .invite_member(
                Some(&s.admin),
                InviteMember {
                    email: "NUEVO@liceo.cl".to_string(),
                    role: MembershipRole::Profesor,
                },
            )
            .unwrap();

        assert_eq!(
            code(create(&s, &invitee, CourseId::new(), today(), attendance())),
            "membership_inactive"
        );
        let ctx = s.ops.whoami(Some(&invitee)).unwrap();
        assert_eq!(ctx.institution_id(), s.institution);
        assert_eq!(ctx.membership.map(|m| m.status), Some(MembershipStatus::Invited));
    }

    #[test]
    fn membership_lifecycle_is_enforced() {
        let s = school();
        let membership_id = s
            .ops
            .list_members(Some(&s.admin))
            .unwrap()
            .into_iter()
            .find(|m| m.display_name == "norte-profesor")
            .unwrap()
            .membership
            .id;

        s.ops.suspend_member(Some(&s.admin), membership_id).unwrap();
        assert_eq!(code(create(&s, &s.profesor, CourseId::new(), today(), attendance())), "membership_inactive");
        assert_eq!(code(s.ops.suspend_member(Some(&s.profesor), membership_id)), "membership_inactive");

        s.ops.reactivate_member(Some(&s.admin), membership_id).unwrap();
        assert!(create(&s, &s.profesor, CourseId::new(), today(), attendance()).is_ok());

        let invite_again = InviteMember {
            email: "norte-profesor@liceo.cl".to_string(),
            role: MembershipRole::Mentor,
        };
        assert_eq!(code(s.ops.invite_member(Some(&s.admin), invite_again.clone())), "conflict");

        s.ops.leave_institution(Some(&s.profesor)).unwrap();
        assert_eq!(code(s.ops.whoami(Some(&s.profesor))), "no_institution");

        let back = s.ops.invite_member(Some(&s.admin), invite_again).unwrap();
        assert_eq!(back.id, membership_id);
        assert_eq!(back.role, MembershipRole::Mentor);
        assert_eq!(back.status, MembershipStatus::Invited);
    }

    #[test]
    fn master_deactivates_accounts() {
        let s = school();
        let master = promote_to_master(&s.ops, "soporte");
        assert_eq!(code(s.ops.whoami(Some(&master))), "no_institution");

        let profesor_id = s.ops.whoami(Some(&s.profesor)).unwrap().user_id();
        let args = SetUserActive {
            user_id: profesor_id,
            is_active: false,
        };
        assert_eq!(code(s.ops.set_user_active(Some(&s.admin), args)), "insufficient_role");

        assert_eq!(code(s.ops.set_user_active(Some(&s.profesor), args)), "insufficient_role");

        s.ops.set_user_active(Some(&master), args).unwrap();
        assert_eq!(code(s.ops.whoami(Some(&s.profesor))), "inactive_user");

        let own = SetUserActive {
            user_id: s.ops.database().read(|t| t.users.iter().find(|u| u.external_id == master.subject).unwrap().id).unwrap(),
            is_active: false,
        };
        assert_eq!(code(s.ops.set_user_active(Some(&master), own)), "conflict");
    }

    #[test]
    fn unknown_sessions_are_rejected() {
        let s = school();
        assert_eq!(code(s.ops.whoami(None)), "authentication_required");
        assert_eq!(code(s.ops.whoami(Some(&Identity::new("auth|nadie")))), "user_not_found");
        assert_eq!(
            code(s.ops.register_user(
                Some(&s.profesor),
                RegisterUser {
                    display_name: "otra vez".to_string(),
                    email: None,
                },
            )),
            "conflict"
        );
    }

    fn body_of(record_type: RecordType) -> RecordBody {
        match record_type {
            RecordType::Attendance => attendance(),
            RecordType::ClassContent => content("Contenido"),
            RecordType::Grade => RecordBody::Grade {
                student_id: StudentId::new(),
                evaluation: "Control".to_string(),
                value: 5.0,
            },
            RecordType::Observation => RecordBody::Observation {
                student_id: StudentId::new(),
                kind: astral_libro::ObservationKind::Positive,
                text: "Participa activamente".to_string(),
            },
        }
    }

    fn any_record_type() -> impl Strategy<Value = RecordType> {
        prop_oneof![
            Just(RecordType::Attendance),
            Just(RecordType::ClassContent),
            Just(RecordType::Grade),
            Just(RecordType::Observation),
        ]
    }

    fn any_target() -> impl Strategy<Value = LockTarget> {
        prop_oneof![Just(LockTarget::All), any_record_type().prop_map(LockTarget::Only)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn applicable_lock_rejects_every_mutation(target in any_target(), record_type in any_record_type()) {
            let s = school();
            let course = CourseId::new();
            let record = create(&s, &s.profesor, course, today(), body_of(record_type)).unwrap();
            s.ops
                .lock_scope(
                    Some(&s.admin),
                    LockScope { course_id: course, period: current_period(), target, reason: None },
                )
                .unwrap();

            if target.covers(record_type) {
                prop_assert_eq!(code(sign(&s, &s.profesor, &record)), "record_locked");
                prop_assert_eq!(code(create(&s, &s.profesor, course, today(), body_of(record_type))), "record_locked");
                prop_assert_eq!(state(&s, &record), RecordState::Locked);
            } else {
                prop_assert!(sign(&s, &s.profesor, &record).is_ok());
                prop_assert_eq!(state(&s, &record), RecordState::Signed);
            }
        }
    }
}
