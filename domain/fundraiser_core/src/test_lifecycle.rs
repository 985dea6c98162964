use chrono::Utc;

use crate::invariants::{assert_immutable_fields, assert_valid_status_transition};
use crate::lifecycle::{
    ensure_creator, ensure_editable, validate_account_details, validate_basic_details,
    AccountDetailsDraft, BasicDetailsDraft,
};
use crate::{CreatorSummary, Error, Fundraiser, FundraiserStatus, Money, Transition};

fn draft(title: &str, description: &str, category: &str, target: Option<Money>) -> BasicDetailsDraft {
    BasicDetailsDraft {
        title: Some(title.to_string()),
        description: Some(description.to_string()),
        category: Some(category.to_string()),
        target,
    }
}

fn fresh_fundraiser() -> Fundraiser {
    let now = Utc::now();
    Fundraiser {
        id: "f-1".to_string(),
        creator: CreatorSummary {
            id: "u-1".to_string(),
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
        },
        basic_details: validate_basic_details(draft(
            "Help Ana",
            "Medical",
            "Medical",
            Some(Money::from_cents(100_000)),
        ))
        .unwrap(),
        status: FundraiserStatus::Pending,
        proofs: Vec::new(),
        account_details: None,
        verified_by: None,
        amount_raised: Money::ZERO,
        donations: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_basic_details_require_title_description_category() {
    let ok = validate_basic_details(draft("Help Ana", "Medical", "Medical", None)).unwrap();
    assert_eq!(ok.title, "Help Ana");
    assert_eq!(ok.target, Money::ZERO);

    for missing in ["title", "description", "category"] {
        let mut d = draft("t", "d", "c", None);
        match missing {
            "title" => d.title = None,
            "description" => d.description = Some("   ".to_string()),
            _ => d.category = None,
        }
        let err = validate_basic_details(d).unwrap_err();
        assert_eq!(err, Error::Validation(format!("{missing} is required")));
    }
}

#[test]
fn test_negative_target_rejected() {
    let err = validate_basic_details(draft("t", "d", "c", Some(Money::from_cents(-1)))).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn test_account_details_require_every_field() {
    let full = AccountDetailsDraft {
        bank_name: Some("First Bank".into()),
        account_number: Some("0012345".into()),
        routing_code: Some("FBNK0001".into()),
    };
    let details = validate_account_details(full.clone()).unwrap();
    assert_eq!(details.routing_code, "FBNK0001");

    let mut partial = full;
    partial.account_number = None;
    assert_eq!(
        validate_account_details(partial).unwrap_err(),
        Error::Validation("accountNumber is required".into())
    );
}

#[test]
fn test_legacy_ifsc_field_is_accepted() {
    let draft: AccountDetailsDraft = serde_json::from_str(
        r#"{"bankName":"First Bank","accountNumber":"1","ifsc":"FBNK0001"}"#,
    )
    .unwrap();
    assert_eq!(draft.routing_code.as_deref(), Some("FBNK0001"));
}

#[test]
fn test_forward_path_reaches_published() {
    let original = fresh_fundraiser();
    let mut f = original.clone();

    for t in [Transition::Verify, Transition::Publish] {
        let next = f.status.apply(t).unwrap();
        assert_valid_status_transition(f.status, next);
        f.status = next;
    }

    assert_eq!(f.status, FundraiserStatus::Published);
    assert_immutable_fields(&original, &f);
}

#[test]
fn test_verify_only_from_pending() {
    assert_eq!(
        FundraiserStatus::Pending.apply(Transition::Verify),
        Ok(FundraiserStatus::Verified)
    );
    for from in [
        FundraiserStatus::Verified,
        FundraiserStatus::Published,
        FundraiserStatus::Rejected,
    ] {
        assert_eq!(
            from.apply(Transition::Verify),
            Err(Error::InvalidTransition { action: "verify", from })
        );
    }
}

#[test]
fn test_publish_only_from_verified() {
    for from in FundraiserStatus::ALL {
        let result = from.apply(Transition::Publish);
        if from == FundraiserStatus::Verified {
            assert_eq!(result, Ok(FundraiserStatus::Published));
        } else {
            assert!(result.is_err(), "publish from {from} should fail");
        }
    }
}

#[test]
fn test_terminal_states_have_no_exits() {
    for from in [FundraiserStatus::Published, FundraiserStatus::Rejected] {
        assert!(from.is_terminal());
        for t in [Transition::Verify, Transition::Reject, Transition::Publish] {
            assert!(from.apply(t).is_err());
        }
    }
}

#[test]
fn test_reviewer_recorded_on_verify_and_reject_only() {
    assert!(Transition::Verify.records_reviewer());
    assert!(Transition::Reject.records_reviewer());
    assert!(!Transition::Publish.records_reviewer());
}

#[test]
fn test_wizard_steps_are_owner_only_and_pending_only() {
    assert!(ensure_creator("u-1", "u-1").is_ok());
    assert!(matches!(ensure_creator("u-1", "u-2"), Err(Error::Unauthorized(_))));

    assert!(ensure_editable(FundraiserStatus::Pending, "attach proofs to").is_ok());
    let err = ensure_editable(FundraiserStatus::Verified, "attach proofs to").unwrap_err();
    assert_eq!(err.to_string(), "cannot attach proofs to a fundraiser that is verified");
}
