// Anti-flood preferences: cooldown, daily cap and lazy day rollover

mod common;

use agenda_backend_core::{
    models::{Customer, PreferencesRequest},
    services::{AntiFloodPolicy, PreferencesService, RejectReason},
    store::{CustomerStore, MemoryCustomerStore},
    ServiceError,
};
use chrono::{Duration, TimeZone, Utc};
use common::{fixed_now, onboarded_customer, preferences_payload};
use std::sync::Arc;

fn request(send_hour: &str) -> PreferencesRequest {
    serde_json::from_value(preferences_payload(&["work", "home"], send_hour)).unwrap()
}

async fn setup(customer: Customer) -> (MemoryCustomerStore, PreferencesService) {
    let store = MemoryCustomerStore::new();
    store.put(customer).await;
    let service = PreferencesService::new(Arc::new(store.clone()), AntiFloodPolicy::default());
    (store, service)
}

fn assert_rejected(result: Result<Customer, ServiceError>, expected: RejectReason) {
    match result {
        Err(ServiceError::RateLimited { reason }) => assert_eq!(reason, expected),
        other => panic!("expected rate limit {:?}, got {:?}", expected, other),
    }
}

#[tokio::test]
async fn test_first_save_applies_and_stamps() {
    let customer = onboarded_customer(1, fixed_now());
    let (store, service) = setup(customer.clone()).await;
    let now = fixed_now();

    let updated = service.save(customer.id, request("08:15"), now).await.unwrap();

    assert_eq!(updated.selected_resource_ids, vec!["home", "work"]);
    assert_eq!(updated.send_hour, "08:15");
    assert_eq!(updated.timezone, "Europe/Paris");
    assert_eq!(updated.prefs_last_updated_at, Some(now));
    assert_eq!(updated.prefs_change_count_today, 1);
    assert_eq!(updated.prefs_change_date, Some(now.date_naive()));

    let stored = store.find_by_id(customer.id).await.unwrap().unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn test_cooldown_boundary() {
    let customer = onboarded_customer(1, fixed_now());
    let (store, service) = setup(customer.clone()).await;
    let now = fixed_now();

    service.save(customer.id, request("08:00"), now).await.unwrap();

    let early = service
        .save(customer.id, request("09:00"), now + Duration::seconds(59))
        .await;
    assert_rejected(early, RejectReason::TooFrequent);

    let stored = store.find_by_id(customer.id).await.unwrap().unwrap();
    assert_eq!(stored.send_hour, "08:00");
    assert_eq!(stored.prefs_change_count_today, 1);

    let on_time = service
        .save(customer.id, request("09:00"), now + Duration::seconds(60))
        .await
        .unwrap();
    assert_eq!(on_time.send_hour, "09:00");
    assert_eq!(on_time.prefs_change_count_today, 2);
}

#[tokio::test]
async fn test_daily_limit_rejects_twenty_first_change() {
    let mut customer = onboarded_customer(1, fixed_now());
    let now = fixed_now();
    customer.prefs_change_count_today = 19;
    customer.prefs_change_date = Some(now.date_naive());
    customer.prefs_last_updated_at = Some(now - Duration::minutes(10));
    let (_store, service) = setup(customer.clone()).await;

    let twentieth = service.save(customer.id, request("08:00"), now).await.unwrap();
    assert_eq!(twentieth.prefs_change_count_today, 20);

    let rejected = service
        .save(customer.id, request("09:00"), now + Duration::minutes(5))
        .await;
    assert_rejected(rejected, RejectReason::DailyLimit);
}

#[tokio::test]
async fn test_cooldown_is_checked_before_daily_limit() {
    let mut customer = onboarded_customer(1, fixed_now());
    let now = fixed_now();
    customer.prefs_change_count_today = 20;
    customer.prefs_change_date = Some(now.date_naive());
    customer.prefs_last_updated_at = Some(now - Duration::seconds(5));
    let (_store, service) = setup(customer.clone()).await;

    let result = service.save(customer.id, request("08:00"), now).await;
    assert_rejected(result, RejectReason::TooFrequent);
}

#[tokio::test]
async fn test_new_day_resets_the_counter() {
    let mut customer = onboarded_customer(1, fixed_now());
    let yesterday_evening = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 30).unwrap();
    customer.prefs_change_count_today = 20;
    customer.prefs_change_date = Some(yesterday_evening.date_naive());
    customer.prefs_last_updated_at = Some(yesterday_evening);
    let (_store, service) = setup(customer.clone()).await;

    let after_midnight = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 30).unwrap();
    let updated = service
        .save(customer.id, request("08:00"), after_midnight)
        .await
        .unwrap();

    assert_eq!(updated.prefs_change_count_today, 1);
    assert_eq!(updated.prefs_change_date, Some(after_midnight.date_naive()));
}

#[tokio::test]
async fn test_view_reports_remaining_changes() {
    let customer = onboarded_customer(1, fixed_now());
    let (_store, service) = setup(customer.clone()).await;
    let now = fixed_now();

    assert_eq!(service.view(&customer, now).changes_remaining_today, 20);

    let updated = service.save(customer.id, request("08:00"), now).await.unwrap();
    let view = service.view(&updated, now);
    assert_eq!(view.changes_remaining_today, 19);
    assert_eq!(view.last_updated_at, Some(now));
    assert_eq!(view.calendar_ids, vec!["home", "work"]);

    let tomorrow = now + Duration::days(1);
    assert_eq!(service.view(&updated, tomorrow).changes_remaining_today, 20);
}

#[tokio::test]
async fn test_concurrent_saves_allow_exactly_one() {
    let customer = onboarded_customer(1, fixed_now());
    let (store, service) = setup(customer.clone()).await;
    let service = Arc::new(service);
    let now = fixed_now();
    let customer_id = customer.id;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = service.clone();
            let hour = format!("0{}:00", i);
            tokio::spawn(async move { service.save(customer_id, request(&hour), now).await })
        })
        .collect();

    let mut applied = 0;
    let mut throttled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(ServiceError::RateLimited { reason }) => {
                assert_eq!(reason, RejectReason::TooFrequent);
                throttled += 1;
            },
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(throttled, 7);

    let stored = store.find_by_id(customer.id).await.unwrap().unwrap();
    assert_eq!(stored.prefs_change_count_today, 1);
}

#[tokio::test]
async fn test_invalid_send_hour_is_rejected_before_policy() {
    let customer = onboarded_customer(1, fixed_now());
    let (store, service) = setup(customer.clone()).await;

    let result = service
        .save(customer.id, request("25:00"), fixed_now())
        .await;
    assert!(matches!(result, Err(ServiceError::ValidationFailed(_))));

    let stored = store.find_by_id(customer.id).await.unwrap().unwrap();
    assert_eq!(stored.prefs_last_updated_at, None);
}

#[tokio::test]
async fn test_unknown_customer_is_not_found() {
    let (_store, service) = setup(onboarded_customer(1, fixed_now())).await;

    let result = service
        .save(uuid::Uuid::new_v4(), request("08:00"), fixed_now())
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound)));
}
