mod common;

use chrono::Duration;
use proptest::prelude::*;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use uuid::Uuid;

use car_rental_backend::entities::booking::{BookingStatus, PaymentStatus};
use car_rental_backend::entities::user::UserRole;
use car_rental_backend::error::AppError;
use car_rental_backend::services::booking::{
    ranges_overlap, BookingService, BookingUpdate, CreateBookingRequest, PaymentOutcome,
};

use common::{booking_request, claims_for, create_car, create_user, date, test_db};

const TODAY: &str = "2024-05-01";

fn update(status: Option<BookingStatus>, payment_status: Option<PaymentStatus>) -> BookingUpdate {
    BookingUpdate {
        status,
        payment_status,
    }
}

// ── Creation ──

#[tokio::test]
async fn create_computes_days_and_amount() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let user = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let car = create_car(&db, "Toyota", 100.0, true).await;

    let view = service
        .create(user.id, booking_request(car.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap();

    assert_eq!(view.booking.total_days, 3);
    assert_eq!(view.booking.total_amount, 300.0);
    assert_eq!(view.booking.status, BookingStatus::Pending);
    assert_eq!(view.booking.payment_status, PaymentStatus::Pending);
    assert_eq!(view.car.as_ref().map(|c| c.id), Some(car.id));
    assert_eq!(view.user.as_ref().map(|u| u.email.as_str()), Some("alice@test.com"));
}

#[tokio::test]
async fn overlapping_request_is_rejected() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let user = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let car = create_car(&db, "Toyota", 100.0, true).await;

    service
        .create(user.id, booking_request(car.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap();

    let err = service
        .create(user.id, booking_request(car.id, date("2024-06-03"), date("2024-06-05")), date(TODAY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Ranges are closed, so sharing the boundary day also conflicts
    let err = service
        .create(user.id, booking_request(car.id, date("2024-06-04"), date("2024-06-06")), date(TODAY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    service
        .create(user.id, booking_request(car.id, date("2024-06-05"), date("2024-06-07")), date(TODAY))
        .await
        .unwrap();
}

#[tokio::test]
async fn other_cars_and_cancelled_bookings_do_not_conflict() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let user = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let first = create_car(&db, "Toyota", 100.0, true).await;
    let second = create_car(&db, "Honda", 80.0, true).await;

    let booking = service
        .create(user.id, booking_request(first.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap();
    service
        .create(user.id, booking_request(second.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap();

    service.cancel(booking.booking.id, &claims_for(&user)).await.unwrap();

    service
        .create(user.id, booking_request(first.id, date("2024-06-02"), date("2024-06-03")), date(TODAY))
        .await
        .unwrap();
}

#[tokio::test]
async fn create_validates_input_before_touching_dates() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let user = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let car = create_car(&db, "Toyota", 100.0, true).await;
    let parked = create_car(&db, "Ford", 60.0, false).await;

    let missing = CreateBookingRequest {
        dropoff_location: None,
        ..booking_request(car.id, date("2024-06-01"), date("2024-06-04"))
    };
    let err = service.create(user.id, missing, date(TODAY)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = service
        .create(user.id, booking_request(Uuid::new_v4(), date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = service
        .create(user.id, booking_request(parked.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));

    let err = service
        .create(user.id, booking_request(car.id, date("2024-04-30"), date("2024-05-03")), date(TODAY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidDateRange(_)));

    let err = service
        .create(user.id, booking_request(car.id, date("2024-06-04"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidDateRange(_)));

    // Starting today is allowed
    service
        .create(user.id, booking_request(car.id, date(TODAY), date("2024-05-02")), date(TODAY))
        .await
        .unwrap();
}

#[tokio::test]
async fn amount_is_not_recomputed_when_price_changes() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let user = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let car = create_car(&db, "Toyota", 100.0, true).await;

    let created = service
        .create(user.id, booking_request(car.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap();

    let mut active = car.into_active_model();
    active.price_per_day = Set(250.0);
    active.update(&db).await.unwrap();

    let stored = service.find(created.booking.id).await.unwrap();
    assert_eq!(stored.total_amount, 300.0);
}

// ── Cancellation ──

#[tokio::test]
async fn cancel_is_terminal_and_owner_scoped() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let owner = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let stranger = create_user(&db, "bob@test.com", UserRole::Customer).await;
    let car = create_car(&db, "Toyota", 100.0, true).await;

    let booking = service
        .create(owner.id, booking_request(car.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap();
    let id = booking.booking.id;

    let err = service.cancel(id, &claims_for(&stranger)).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let cancelled = service.cancel(id, &claims_for(&owner)).await.unwrap();
    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);

    let err = service.cancel(id, &claims_for(&owner)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let err = service.cancel(Uuid::new_v4(), &claims_for(&owner)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn admin_can_cancel_confirmed_but_not_completed() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let owner = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let admin = create_user(&db, "admin@test.com", UserRole::Admin).await;
    let car = create_car(&db, "Toyota", 100.0, true).await;

    let first = service
        .create(owner.id, booking_request(car.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap();
    service
        .update_status(first.booking.id, update(Some(BookingStatus::Confirmed), None))
        .await
        .unwrap();
    let cancelled = service.cancel(first.booking.id, &claims_for(&admin)).await.unwrap();
    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);

    let second = service
        .create(owner.id, booking_request(car.id, date("2024-07-01"), date("2024-07-03")), date(TODAY))
        .await
        .unwrap();
    let id = second.booking.id;
    service
        .update_status(id, update(Some(BookingStatus::Confirmed), Some(PaymentStatus::Paid)))
        .await
        .unwrap();
    service.update_status(id, update(Some(BookingStatus::Active), None)).await.unwrap();
    service.update_status(id, update(Some(BookingStatus::Completed), None)).await.unwrap();

    let err = service.cancel(id, &claims_for(&admin)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

// ── Admin updates ──

#[tokio::test]
async fn activation_is_gated_on_payment() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let user = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let car = create_car(&db, "Toyota", 100.0, true).await;

    let booking = service
        .create(user.id, booking_request(car.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap();
    let id = booking.booking.id;

    // Skipping Confirmed is not allowed even when paid
    let err = service
        .update_status(id, update(Some(BookingStatus::Active), Some(PaymentStatus::Paid)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    service.update_status(id, update(Some(BookingStatus::Confirmed), None)).await.unwrap();

    let err = service
        .update_status(id, update(Some(BookingStatus::Active), None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(service.find(id).await.unwrap().status, BookingStatus::Confirmed);

    let paid = service.update_status(id, update(None, Some(PaymentStatus::Paid))).await.unwrap();
    assert_eq!(paid.booking.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.booking.status, BookingStatus::Confirmed);

    let active = service.update_status(id, update(Some(BookingStatus::Active), None)).await.unwrap();
    assert_eq!(active.booking.status, BookingStatus::Active);
}

#[tokio::test]
async fn update_requires_a_field_and_an_existing_booking() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());

    let err = service.update_status(Uuid::new_v4(), update(None, None)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = service
        .update_status(Uuid::new_v4(), update(Some(BookingStatus::Confirmed), None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ── Payments ──

#[tokio::test]
async fn payment_outcome_does_not_advance_status() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let user = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let car = create_car(&db, "Toyota", 100.0, true).await;

    let booking = service
        .create(user.id, booking_request(car.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap();
    let id = booking.booking.id;

    let failed = service.record_payment(id, PaymentOutcome::Failed).await.unwrap();
    assert_eq!(failed.booking.payment_status, PaymentStatus::Failed);

    let paid = service.record_payment(id, PaymentOutcome::Paid).await.unwrap();
    assert_eq!(paid.booking.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.booking.status, BookingStatus::Pending);

    let err = service.record_payment(Uuid::new_v4(), PaymentOutcome::Paid).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn late_payment_results_cannot_undo_settled_state() {
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let user = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let car = create_car(&db, "Toyota", 100.0, true).await;

    let active = service
        .create(user.id, booking_request(car.id, date("2024-06-01"), date("2024-06-04")), date(TODAY))
        .await
        .unwrap();
    let id = active.booking.id;
    service
        .update_status(id, update(Some(BookingStatus::Confirmed), Some(PaymentStatus::Paid)))
        .await
        .unwrap();
    service.update_status(id, update(Some(BookingStatus::Active), None)).await.unwrap();

    let err = service.record_payment(id, PaymentOutcome::Failed).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    let stored = service.find(id).await.unwrap();
    assert_eq!((stored.status, stored.payment_status), (BookingStatus::Active, PaymentStatus::Paid));

    // A repeated success is harmless
    let again = service.record_payment(id, PaymentOutcome::Paid).await.unwrap();
    assert_eq!(again.booking.payment_status, PaymentStatus::Paid);

    let cancelled = service
        .create(user.id, booking_request(car.id, date("2024-07-01"), date("2024-07-03")), date(TODAY))
        .await
        .unwrap();
    let cancelled_id = cancelled.booking.id;
    service.cancel(cancelled_id, &claims_for(&user)).await.unwrap();

    for outcome in [PaymentOutcome::Paid, PaymentOutcome::Failed] {
        let err = service.record_payment(cancelled_id, outcome).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }
    let stored = service.find(cancelled_id).await.unwrap();
    assert_eq!((stored.status, stored.payment_status), (BookingStatus::Cancelled, PaymentStatus::Pending));
}

// ── Concurrency ──

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overlapping_creates_admit_one() {
    // SQLite ignores the car row lock; the single pooled connection serializes
    // these transactions instead. On Postgres the `FOR UPDATE` lock on the car
    // row is what provides the same guarantee, and this test does not cover it.
    let db = test_db().await;
    let service = BookingService::new(db.clone());
    let user = create_user(&db, "alice@test.com", UserRole::Customer).await;
    let car = create_car(&db, "Toyota", 100.0, true).await;

    let (user_id, car_id) = (user.id, car.id);
    let mut handles = Vec::new();
    for offset in 0..8i64 {
        let service = service.clone();
        let start = date("2024-06-01") + Duration::days(offset % 2);
        let end = start + Duration::days(3);
        handles.push(tokio::spawn(async move {
            service
                .create(user_id, booking_request(car_id, start, end), date(TODAY))
                .await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(service.list_for_user(user.id).await.unwrap().len(), 1);
}

// ── Properties ──

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Whatever order ranges arrive in, a range is accepted exactly when it
    /// overlaps none of the ranges accepted before it.
    #[test]
    fn accepted_ranges_never_overlap(
        ranges in prop::collection::vec((0i64..40, 1i64..8), 1..12)
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let db = test_db().await;
            let service = BookingService::new(db.clone());
            let user = create_user(&db, "prop@test.com", UserRole::Customer).await;
            let car = create_car(&db, "Toyota", 50.0, true).await;
            let base = date("2024-06-01");

            let mut accepted: Vec<(chrono::NaiveDate, chrono::NaiveDate)> = Vec::new();
            for (offset, len) in ranges {
                let start = base + Duration::days(offset);
                let end = start + Duration::days(len);
                let expected_ok = accepted
                    .iter()
                    .all(|&(s, e)| !ranges_overlap(s, e, start, end));

                let result = service
                    .create(user.id, booking_request(car.id, start, end), date(TODAY))
                    .await;

                match result {
                    Ok(view) => {
                        assert!(expected_ok, "accepted overlapping range {start}..{end}");
                        assert_eq!(i64::from(view.booking.total_days), len);
                        assert_eq!(view.booking.total_amount, len as f64 * 50.0);
                        accepted.push((start, end));
                    }
                    Err(AppError::Conflict(_)) => {
                        assert!(!expected_ok, "rejected free range {start}..{end}");
                    }
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }

            for (i, &(s1, e1)) in accepted.iter().enumerate() {
                for &(s2, e2) in &accepted[i + 1..] {
                    assert!(!ranges_overlap(s1, e1, s2, e2));
                }
            }
        });
    }
}
