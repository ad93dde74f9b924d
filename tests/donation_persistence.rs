//! Repository contract tests run against the in-memory implementation.

use std::sync::Arc;

use giveharbor::adapters::events::InMemoryEventBus;
use giveharbor::adapters::memory::{InMemoryDonationRepository, InMemoryDonorRepository};
use giveharbor::domain::donation::{BillingAddress, DonationMode, DonationStatus, NewDonation};
use giveharbor::domain::foundation::{DonorId, ErrorCode, Money, SubscriptionId};
use giveharbor::ports::{CompletionOutcome, DonationRepository, Donor};

struct Store {
    donors: Arc<InMemoryDonorRepository>,
    donations: Arc<InMemoryDonationRepository>,
    bus: Arc<InMemoryEventBus>,
}

fn store() -> Store {
    let donors = Arc::new(InMemoryDonorRepository::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let donations = Arc::new(InMemoryDonationRepository::new(
        donors.clone(),
        bus.clone(),
    ));
    Store {
        donors,
        donations,
        bus,
    }
}

fn seed_donor(store: &Store) -> Donor {
    store.donors.add_donor("Ada", "Lovelace", "ada@example.com")
}

fn new_donation(donor_id: DonorId) -> NewDonation {
    NewDonation {
        status: Some(DonationStatus::Pending),
        amount: Some(Money::new(5000, "USD").unwrap()),
        gateway_id: Some("test-gateway".to_string()),
        donor_id: Some(donor_id),
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        email: Some("ada@example.com".to_string()),
        form_id: Some(10.into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn insert_round_trips_and_fills_defaults() {
    let s = store();
    let donor = seed_donor(&s);

    let donation = s.donations.insert(new_donation(donor.id)).await.unwrap();

    assert_eq!(donation.status, DonationStatus::Pending);
    assert_eq!(donation.amount.amount_minor(), 5000);
    assert_eq!(donation.mode, DonationMode::Test);
    assert_eq!(donation.donor_ip, "0.0.0.0");
    assert_eq!(donation.purchase_key.len(), 32);
    assert!(donation.purchase_key.chars().all(|c| c.is_ascii_hexdigit()));

    let loaded = s.donations.get_by_id(donation.id).await.unwrap().unwrap();
    assert_eq!(loaded, donation);
}

#[tokio::test]
async fn generated_purchase_keys_are_unique() {
    let s = store();
    let donor = seed_donor(&s);

    let a = s.donations.insert(new_donation(donor.id)).await.unwrap();
    let b = s.donations.insert(new_donation(donor.id)).await.unwrap();
    assert_ne!(a.purchase_key, b.purchase_key);
}

#[tokio::test]
async fn explicit_purchase_key_is_kept() {
    let s = store();
    let donor = seed_donor(&s);

    let mut input = new_donation(donor.id);
    input.purchase_key = Some("my-key".to_string());
    let donation = s.donations.insert(input).await.unwrap();
    assert_eq!(donation.purchase_key, "my-key");
}

#[tokio::test]
async fn each_required_field_is_reported_by_name() {
    let s = store();
    let donor = seed_donor(&s);

    let cases: Vec<(&str, Box<dyn Fn(&mut NewDonation)>)> = vec![
        ("status", Box::new(|d| d.status = None)),
        ("amount", Box::new(|d| d.amount = None)),
        ("gateway_id", Box::new(|d| d.gateway_id = None)),
        ("donor_id", Box::new(|d| d.donor_id = None)),
        ("first_name", Box::new(|d| d.first_name = None)),
        ("last_name", Box::new(|d| d.last_name = None)),
        ("email", Box::new(|d| d.email = None)),
        ("form_id", Box::new(|d| d.form_id = None)),
    ];

    for (field, clear) in cases {
        let mut input = new_donation(donor.id);
        clear(&mut input);
        let err = s.donations.insert(input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed, "field {}", field);
        assert!(
            err.message.contains(field),
            "expected '{}' in: {}",
            field,
            err.message
        );
    }

    // Nothing was stored and no lifecycle event fired for any attempt.
    assert_eq!(s.donations.count_by_donor_id(donor.id).await.unwrap(), 0);
    assert_eq!(s.bus.event_count(), 0);
}

#[tokio::test]
async fn unknown_donor_is_rejected_before_any_write() {
    let s = store();
    let err = s
        .donations
        .insert(new_donation(DonorId::new(999)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DonorNotFound);
    assert_eq!(s.bus.event_count(), 0);
}

#[tokio::test]
async fn insert_publishes_creating_then_created() {
    let s = store();
    let donor = seed_donor(&s);

    s.donations.insert(new_donation(donor.id)).await.unwrap();

    assert_eq!(
        s.bus.event_types_in_order(),
        vec!["donation.creating".to_string(), "donation.created".to_string()]
    );
}

#[tokio::test]
async fn failed_insert_leaves_no_partial_state() {
    let s = store();
    let donor = seed_donor(&s);

    s.donations.fail_next_write();
    let err = s.donations.insert(new_donation(donor.id)).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::PersistenceFailed);
    assert_eq!(err.message, "Failed creating a donation");
    assert_eq!(s.donations.count_by_donor_id(donor.id).await.unwrap(), 0);
    assert!(!s.bus.has_event("donation.created"));

    // The switch resets; the next insert succeeds.
    assert!(s.donations.insert(new_donation(donor.id)).await.is_ok());
}

#[tokio::test]
async fn update_replaces_the_whole_record() {
    let s = store();
    let donor = seed_donor(&s);

    let mut input = new_donation(donor.id);
    input.level_id = Some("gold".to_string());
    input.billing_address = BillingAddress {
        city: Some("Lisbon".to_string()),
        ..Default::default()
    };
    let donation = s.donations.insert(input).await.unwrap();
    s.bus.clear();

    // Hand back a record with those attributes absent; they must not survive.
    let mut edited = donation.clone();
    edited.level_id = None;
    edited.billing_address = BillingAddress::default();
    edited.first_name = "Augusta".to_string();

    let updated = s.donations.update(&edited).await.unwrap();
    assert_eq!(updated.first_name, "Augusta");
    assert_eq!(updated.level_id, None);
    assert!(updated.billing_address.is_empty());
    assert!(updated.updated_at >= donation.updated_at);

    let loaded = s.donations.get_by_id(donation.id).await.unwrap().unwrap();
    assert_eq!(loaded.level_id, None);
    assert!(loaded.billing_address.is_empty());

    assert_eq!(
        s.bus.event_types_in_order(),
        vec!["donation.updating".to_string(), "donation.updated".to_string()]
    );
}

#[tokio::test]
async fn update_of_missing_donation_fails() {
    let s = store();
    let donor = seed_donor(&s);

    let donation = s.donations.insert(new_donation(donor.id)).await.unwrap();
    s.donations.delete(&donation).await.unwrap();

    let err = s.donations.update(&donation).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DonationNotFound);
}

#[tokio::test]
async fn failed_update_keeps_the_stored_record() {
    let s = store();
    let donor = seed_donor(&s);

    let donation = s.donations.insert(new_donation(donor.id)).await.unwrap();

    let mut edited = donation.clone();
    edited.first_name = "Changed".to_string();
    s.donations.fail_next_write();
    let err = s.donations.update(&edited).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::PersistenceFailed);

    let loaded = s.donations.get_by_id(donation.id).await.unwrap().unwrap();
    assert_eq!(loaded.first_name, "Ada");
}

#[tokio::test]
async fn delete_removes_and_reports_missing() {
    let s = store();
    let donor = seed_donor(&s);

    let donation = s.donations.insert(new_donation(donor.id)).await.unwrap();
    s.bus.clear();

    assert!(s.donations.delete(&donation).await.unwrap());
    assert!(s.donations.get_by_id(donation.id).await.unwrap().is_none());
    assert_eq!(
        s.bus.event_types_in_order(),
        vec!["donation.deleting".to_string(), "donation.deleted".to_string()]
    );

    // Second delete reports false, and only the deleting event fires.
    s.bus.clear();
    assert!(!s.donations.delete(&donation).await.unwrap());
    assert!(!s.bus.has_event("donation.deleted"));
}

#[tokio::test]
async fn subscription_query_returns_newest_first() {
    let s = store();
    let donor = seed_donor(&s);
    let subscription_id = SubscriptionId::new(77);

    let mut ids = Vec::new();
    for _ in 0..3 {
        let mut input = new_donation(donor.id);
        input.subscription_id = Some(subscription_id);
        ids.push(s.donations.insert(input).await.unwrap().id);
    }
    // One unrelated donation that must not appear.
    s.donations.insert(new_donation(donor.id)).await.unwrap();

    let results = s
        .donations
        .query_by_subscription_id(subscription_id)
        .await
        .unwrap();
    ids.reverse();
    assert_eq!(results.iter().map(|d| d.id).collect::<Vec<_>>(), ids);
    assert!(results.iter().all(|d| d.is_recurring()));
}

#[tokio::test]
async fn donor_queries_cover_all_their_donations() {
    let s = store();
    let ada = seed_donor(&s);
    let grace = s.donors.add_donor("Grace", "Hopper", "grace@example.com");

    s.donations.insert(new_donation(ada.id)).await.unwrap();
    s.donations.insert(new_donation(ada.id)).await.unwrap();
    s.donations.insert(new_donation(grace.id)).await.unwrap();

    assert_eq!(s.donations.count_by_donor_id(ada.id).await.unwrap(), 2);
    assert_eq!(s.donations.count_by_donor_id(grace.id).await.unwrap(), 1);

    let ids = s.donations.donation_ids_by_donor_id(ada.id).await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids[0] > ids[1]);
}

#[tokio::test]
async fn mark_processing_only_moves_pending_donations() {
    let s = store();
    let donor = seed_donor(&s);

    let donation = s.donations.insert(new_donation(donor.id)).await.unwrap();
    s.donations
        .complete_payment(donation.id, "tx_1")
        .await
        .unwrap();

    // Already complete: the late processing signal is ignored.
    s.donations
        .mark_processing(donation.id, Some("tx_late"))
        .await
        .unwrap();

    let loaded = s.donations.get_by_id(donation.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, DonationStatus::Complete);
    assert_eq!(loaded.gateway_transaction_id.as_deref(), Some("tx_1"));
}

#[tokio::test]
async fn illegal_status_transition_is_skipped() {
    let s = store();
    let donor = seed_donor(&s);

    let donation = s.donations.insert(new_donation(donor.id)).await.unwrap();

    // Pending donations cannot be refunded.
    s.donations
        .update_status(donation.id, DonationStatus::Refunded)
        .await
        .unwrap();
    let loaded = s.donations.get_by_id(donation.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, DonationStatus::Pending);

    // A legal transition still applies.
    s.donations
        .update_status(donation.id, DonationStatus::Failed)
        .await
        .unwrap();
    let loaded = s.donations.get_by_id(donation.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, DonationStatus::Failed);
}

#[tokio::test]
async fn insert_keeps_the_renewal_parent_link() {
    let s = store();
    let donor = seed_donor(&s);
    let subscription_id = SubscriptionId::new(5);

    let mut initial = new_donation(donor.id);
    initial.subscription_id = Some(subscription_id);
    let initial = s.donations.insert(initial).await.unwrap();

    let mut renewal = new_donation(donor.id);
    renewal.status = Some(DonationStatus::Renewal);
    renewal.subscription_id = Some(subscription_id);
    renewal.parent_id = Some(initial.id);
    let renewal = s.donations.insert(renewal).await.unwrap();

    assert_eq!(renewal.parent_id, Some(initial.id));
    let loaded = s.donations.get_by_id(renewal.id).await.unwrap().unwrap();
    assert_eq!(loaded.parent_id, Some(initial.id));
}

#[tokio::test]
async fn late_failure_signal_cannot_undo_completion() {
    let s = store();
    let donor = seed_donor(&s);

    let donation = s.donations.insert(new_donation(donor.id)).await.unwrap();
    s.donations
        .complete_payment(donation.id, "tx_1")
        .await
        .unwrap();

    // A failed-payment callback arriving after completion must not win.
    s.donations
        .update_status(donation.id, DonationStatus::Failed)
        .await
        .unwrap();

    let loaded = s.donations.get_by_id(donation.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, DonationStatus::Complete);
}

#[tokio::test]
async fn racing_failure_and_completion_agree_on_final_status() {
    let s = store();
    let donor = seed_donor(&s);

    for _ in 0..16 {
        let donation = s.donations.insert(new_donation(donor.id)).await.unwrap();

        let completing = {
            let donations = s.donations.clone();
            let id = donation.id;
            tokio::spawn(async move { donations.complete_payment(id, "tx_race").await })
        };
        let failing = {
            let donations = s.donations.clone();
            let id = donation.id;
            tokio::spawn(async move {
                donations.update_status(id, DonationStatus::Failed).await
            })
        };

        let completion = completing.await.unwrap();
        failing.await.unwrap().unwrap();

        // Whichever side won, the loser must not have overwritten it.
        let loaded = s.donations.get_by_id(donation.id).await.unwrap().unwrap();
        match completion {
            Ok(CompletionOutcome::Applied) => {
                assert_eq!(loaded.status, DonationStatus::Complete)
            }
            _ => assert_eq!(loaded.status, DonationStatus::Failed),
        }
    }
}

#[tokio::test]
async fn mark_processing_replaces_the_stored_transaction_id() {
    let s = store();
    let donor = seed_donor(&s);

    let mut input = new_donation(donor.id);
    input.gateway_transaction_id = Some("tx_created".to_string());
    let donation = s.donations.insert(input).await.unwrap();

    s.donations
        .mark_processing(donation.id, Some("tx_gateway"))
        .await
        .unwrap();

    let loaded = s.donations.get_by_id(donation.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, DonationStatus::Processing);
    assert_eq!(loaded.gateway_transaction_id.as_deref(), Some("tx_gateway"));
}

#[tokio::test]
async fn completion_from_failed_is_an_error() {
    let s = store();
    let donor = seed_donor(&s);

    let donation = s.donations.insert(new_donation(donor.id)).await.unwrap();
    s.donations
        .update_status(donation.id, DonationStatus::Failed)
        .await
        .unwrap();

    let err = s
        .donations
        .complete_payment(donation.id, "tx_1")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);
}
