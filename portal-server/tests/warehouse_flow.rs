//! Intake → box → shipment → invoice against a real database

mod common;

use portal_server::db;
use portal_server::db::invoices::{NotPayableReason, PaymentOutcome};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::error::ErrorCode;
use shared::models::{
    AlertStatus, BoxType, ClientUpdate, InvoiceCreate, InvoiceItemInput, InvoiceStatus,
    InvoiceUpdate, PackageStatus, PackageUpdate, Role, ShipmentStatus,
};

#[tokio::test]
async fn box_weight_tracks_items() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let client = common::client(&pool, "VE").await;
    let b = common::open_box(&pool, client.id, BoxType::Comercial).await;

    let p1 = common::package(&pool, client.id, dec!(1.5)).await;
    let p2 = common::package(&pool, client.id, dec!(2.25)).await;
    let p3 = common::package(&pool, client.id, dec!(3)).await;

    let detail = db::boxes::add_items(&pool, b.id, &[p1.id, p2.id, p3.id]).await.unwrap();
    assert_eq!(detail.shipping_box.weight_lb, dec!(6.75));
    assert_eq!(detail.items.len(), 3);
    assert!(detail.items.iter().all(|p| p.status == PackageStatus::Boxed));

    let detail = db::boxes::remove_item(&pool, b.id, p2.id).await.unwrap();
    assert_eq!(detail.shipping_box.weight_lb, dec!(4.5));
    assert_eq!(detail.shipping_box.item_ids, vec![p1.id, p3.id]);
    let p2 = db::packages::get(&pool, p2.id).await.unwrap();
    assert_eq!(p2.status, PackageStatus::Received);
    assert_eq!(p2.box_id, None);

    // Editing a boxed package's weight updates the box
    let update = PackageUpdate {
        weight_lb: Some(dec!(4)),
        ..Default::default()
    };
    db::packages::update(&pool, p3.id, &update).await.unwrap();
    let b = db::boxes::get(&pool, b.id).await.unwrap();
    assert_eq!(b.weight_lb, dec!(5.5));

    let recalculated = db::boxes::recalculate_weight(&pool, b.id).await.unwrap();
    assert_eq!(recalculated.weight_lb, dec!(5.5));
}

#[tokio::test]
async fn add_items_rejects_foreign_and_boxed_packages() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let owner = common::client(&pool, "VE").await;
    let other = common::client(&pool, "VE").await;
    let b1 = common::open_box(&pool, owner.id, BoxType::Comercial).await;
    let b2 = common::open_box(&pool, owner.id, BoxType::Comercial).await;

    let foreign = common::package(&pool, other.id, Decimal::ONE).await;
    let err = db::boxes::add_items(&pool, b1.id, &[foreign.id]).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::PackageClientMismatch);

    let p = common::package(&pool, owner.id, Decimal::ONE).await;
    db::boxes::add_items(&pool, b1.id, &[p.id]).await.unwrap();
    let err = db::boxes::add_items(&pool, b2.id, &[p.id]).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::PackageAlreadyBoxed);

    let err = db::packages::void(&pool, p.id).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::PackageAlreadyBoxed);
}

#[tokio::test]
async fn box_delete_rejected_when_not_empty_or_shipped() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let client = common::client(&pool, "CO").await;

    let full = common::open_box(&pool, client.id, BoxType::Franquicia).await;
    let p = common::package(&pool, client.id, dec!(2)).await;
    db::boxes::add_items(&pool, full.id, &[p.id]).await.unwrap();
    let err = db::boxes::delete(&pool, full.id).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::BoxNotEmpty);

    let shipped = common::closed_box(&pool, client.id, BoxType::Franquicia).await;
    db::shipments::create(&pool, &[shipped.id]).await.unwrap();
    let err = db::boxes::delete(&pool, shipped.id).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::BoxNotEmpty);

    let empty = common::open_box(&pool, client.id, BoxType::Franquicia).await;
    db::boxes::delete(&pool, empty.id).await.unwrap();
    assert!(db::boxes::find(&pool, empty.id).await.unwrap().is_none());
}

#[tokio::test]
async fn shipment_rejects_mixed_country_and_type() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let ve = common::client(&pool, "VE").await;
    let co = common::client(&pool, "CO").await;

    let ve_box = common::closed_box(&pool, ve.id, BoxType::Comercial).await;
    let co_box = common::closed_box(&pool, co.id, BoxType::Comercial).await;
    let err = db::shipments::create(&pool, &[ve_box.id, co_box.id]).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::ShipmentMixedCountry);

    let ve_franq = common::closed_box(&pool, ve.id, BoxType::Franquicia).await;
    let err = db::shipments::create(&pool, &[ve_box.id, ve_franq.id]).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::ShipmentMixedType);

    // Nothing was linked by the failed attempts
    let ve_box = db::boxes::get(&pool, ve_box.id).await.unwrap();
    assert_eq!(ve_box.shipment_id, None);

    let open = common::open_box(&pool, ve.id, BoxType::Comercial).await;
    let err = db::shipments::create(&pool, &[open.id]).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::BoxNotClosed);
}

#[tokio::test]
async fn shipment_membership_and_lifecycle() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let a = common::client(&pool, "PA").await;
    let b = common::client(&pool, "PA").await;
    let box_a = common::closed_box(&pool, a.id, BoxType::Comercial).await;
    let box_b = common::closed_box(&pool, b.id, BoxType::Comercial).await;

    let shipment = db::shipments::create(&pool, &[box_a.id]).await.unwrap();
    assert_eq!(shipment.country, "PA");
    assert_eq!(shipment.client_ids, vec![a.id]);

    let shipment = db::shipments::add_boxes(&pool, shipment.id, &[box_b.id]).await.unwrap();
    let mut expected = vec![a.id, b.id];
    expected.sort_unstable();
    assert_eq!(shipment.client_ids, expected);

    // A linked box can't be reopened or join a second shipment
    let err = db::boxes::reopen(&pool, box_b.id).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::BoxInShipment);
    let err = db::shipments::create(&pool, &[box_b.id]).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::BoxInShipment);

    let shipment = db::shipments::remove_box(&pool, shipment.id, box_b.id).await.unwrap();
    assert_eq!(shipment.client_ids, vec![a.id]);
    assert_eq!(db::boxes::get(&pool, box_b.id).await.unwrap().shipment_id, None);

    let shipment = db::shipments::advance(&pool, shipment.id, ShipmentStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Shipped);
    let err = db::shipments::add_boxes(&pool, shipment.id, &[box_b.id]).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::ShipmentNotOpen);
    let err = db::shipments::advance(&pool, shipment.id, ShipmentStatus::Closed)
        .await
        .unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::ShipmentInvalidTransition);
}

#[tokio::test]
async fn intake_resolves_open_alert() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let client = common::client(&pool, "VE").await;
    let tracking = common::unique("1z");

    let alert = db::alerts::create(&pool, client.id, &tracking, Some("zapatos"), 1)
        .await
        .unwrap();
    assert_eq!(alert.status, AlertStatus::Open);
    assert_eq!(alert.tracking, tracking.to_uppercase());

    let err = db::alerts::create(&pool, client.id, &tracking, None, 1).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::AlertAlreadyOpen);

    let data = shared::models::PackageCreate {
        tracking: tracking.clone(),
        carrier: None,
        client_id: client.id,
        weight_lb: dec!(1.2),
        photo_url: None,
        notes: None,
    };
    let received = db::packages::receive(&pool, &data).await.unwrap();
    assert_eq!(received.resolved_alerts, 1);

    let err = db::packages::receive(&pool, &data).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::PackageTrackingExists);

    // Announcing an already received tracking creates a resolved alert
    let late = db::alerts::create(&pool, client.id, &tracking, None, 1).await.unwrap();
    assert_eq!(late.status, AlertStatus::Resolved);
    assert_eq!(late.package_id, Some(received.package.id));
}

#[tokio::test]
async fn invoice_totals_and_lifecycle() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let client = common::client(&pool, "VE").await;

    let invoice = db::invoices::create(
        &pool,
        &InvoiceCreate {
            client_id: client.id,
            shipment_id: None,
            items: vec![
                InvoiceItemInput {
                    description: "Flete aereo".into(),
                    quantity: dec!(3.5),
                    unit_price_usd: dec!(4.99),
                },
                InvoiceItemInput {
                    description: "Seguro".into(),
                    quantity: dec!(1),
                    unit_price_usd: dec!(10),
                },
            ],
            notes: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.items[0].total_usd, dec!(17.47));
    assert_eq!(invoice.total_usd, dec!(27.47));

    let update = InvoiceUpdate {
        items: Some(vec![InvoiceItemInput {
            description: "Flete aereo".into(),
            quantity: dec!(2),
            unit_price_usd: dec!(4.99),
        }]),
        notes: Some("ajuste".into()),
    };
    let invoice = db::invoices::update(&pool, invoice.id, &update).await.unwrap();
    assert_eq!(invoice.total_usd, dec!(9.98));
    assert_eq!(invoice.notes.as_deref(), Some("ajuste"));

    let invoice = db::invoices::issue(&pool, invoice.id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Open);

    let invoice = db::invoices::mark_paid(&pool, invoice.id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert!(invoice.paid_at.is_some());

    let err = db::invoices::void(&pool, invoice.id).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::InvoiceAlreadyPaid);
    let err = db::invoices::update(&pool, invoice.id, &InvoiceUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::InvoiceNotEditable);
}

async fn open_invoice(pool: &sqlx::PgPool, client_id: i64, price: Decimal) -> shared::models::Invoice {
    let invoice = db::invoices::create(
        pool,
        &InvoiceCreate {
            client_id,
            shipment_id: None,
            items: vec![InvoiceItemInput {
                description: "Flete".into(),
                quantity: dec!(1),
                unit_price_usd: price,
            }],
            notes: None,
        },
    )
    .await
    .unwrap();
    db::invoices::issue(pool, invoice.id).await.unwrap()
}

#[tokio::test]
async fn checkout_settles_only_current_session_for_full_amount() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let client = common::client(&pool, "VE").await;
    let invoice = open_invoice(&pool, client.id, dec!(20)).await;
    let session_a = common::unique("cs_a");
    db::invoices::set_checkout(&pool, invoice.id, &session_a, "https://pay/a", None)
        .await
        .unwrap();

    // Lines change after the customer opened session A
    let update = InvoiceUpdate {
        items: Some(vec![InvoiceItemInput {
            description: "Flete".into(),
            quantity: dec!(1),
            unit_price_usd: dec!(35),
        }]),
        notes: None,
    };
    let edited = db::invoices::update(&pool, invoice.id, &update).await.unwrap();
    assert_eq!(edited.stripe_session_id, None);
    assert_eq!(edited.checkout_expires_at, None);

    let outcome = db::invoices::settle_from_checkout(&pool, invoice.id, &session_a, Some(2000))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        PaymentOutcome::NotPayable(NotPayableReason::StaleSession { current: None })
    ));
    let still_open = db::invoices::get(&pool, invoice.id).await.unwrap();
    assert_eq!(still_open.status, InvoiceStatus::Open);
    assert_eq!(still_open.paid_at, None);

    let session_b = common::unique("cs_b");
    let expires_at = shared::util::now_millis() + 3_600_000;
    let with_b =
        db::invoices::set_checkout(&pool, invoice.id, &session_b, "https://pay/b", Some(expires_at))
            .await
            .unwrap();
    assert_eq!(with_b.checkout_expires_at, Some(expires_at));

    // Right session, wrong amount
    let outcome = db::invoices::settle_from_checkout(&pool, invoice.id, &session_b, Some(2000))
        .await
        .unwrap();
    match outcome {
        PaymentOutcome::NotPayable(NotPayableReason::AmountMismatch { expected, received }) => {
            assert_eq!(expected, Some(3500));
            assert_eq!(received, Some(2000));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    let outcome = db::invoices::settle_from_checkout(&pool, invoice.id, &session_b, None)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        PaymentOutcome::NotPayable(NotPayableReason::AmountMismatch { .. })
    ));
    assert_eq!(
        db::invoices::get(&pool, invoice.id).await.unwrap().status,
        InvoiceStatus::Open
    );

    let outcome = db::invoices::settle_from_checkout(&pool, invoice.id, &session_b, Some(3500))
        .await
        .unwrap();
    let PaymentOutcome::Paid(paid) = outcome else {
        panic!("expected paid, got {outcome:?}");
    };
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.stripe_session_id.as_deref(), Some(session_b.as_str()));
    assert!(paid.paid_at.is_some());

    let again = db::invoices::settle_from_checkout(&pool, invoice.id, &session_b, Some(3500))
        .await
        .unwrap();
    assert!(matches!(again, PaymentOutcome::AlreadyPaid));
}

#[tokio::test]
async fn checkout_on_void_invoice_is_not_applied() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let client = common::client(&pool, "VE").await;
    let invoice = open_invoice(&pool, client.id, dec!(12.5)).await;
    let session = common::unique("cs_v");
    db::invoices::set_checkout(&pool, invoice.id, &session, "https://pay/v", None)
        .await
        .unwrap();

    let voided = db::invoices::void(&pool, invoice.id).await.unwrap();
    assert_eq!(voided.checkout_url, None);

    let outcome = db::invoices::settle_from_checkout(&pool, invoice.id, &session, Some(1250))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        PaymentOutcome::NotPayable(NotPayableReason::Status(InvoiceStatus::Void))
    ));
    let err = db::invoices::set_checkout(&pool, invoice.id, &session, "https://pay/v", None)
        .await
        .unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::InvoiceNotOpen);
}

#[tokio::test]
async fn webhook_events_are_recorded_once() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let event_id = common::unique("evt_");
    assert!(db::webhook_events::record(&pool, &event_id, "checkout.session.completed").await.unwrap());
    assert!(!db::webhook_events::record(&pool, &event_id, "checkout.session.completed").await.unwrap());

    db::webhook_events::forget(&pool, &event_id).await.unwrap();
    assert!(db::webhook_events::record(&pool, &event_id, "checkout.session.completed").await.unwrap());
}

#[tokio::test]
async fn package_weight_edit_is_bounded_and_moves_box_weight() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let client = common::client(&pool, "VE").await;
    let b = common::open_box(&pool, client.id, BoxType::Comercial).await;
    let p = common::package(&pool, client.id, dec!(2)).await;
    db::boxes::add_items(&pool, b.id, &[p.id]).await.unwrap();

    for bad in [dec!(-1), dec!(100000)] {
        let update = PackageUpdate {
            weight_lb: Some(bad),
            ..Default::default()
        };
        let err = db::packages::update(&pool, p.id, &update).await.unwrap_err();
        assert_eq!(common::code_of(err), ErrorCode::PackageInvalidWeight);
    }
    assert_eq!(db::packages::get(&pool, p.id).await.unwrap().weight_lb, dec!(2));

    let update = PackageUpdate {
        weight_lb: Some(dec!(7.125)),
        ..Default::default()
    };
    let edited = db::packages::update(&pool, p.id, &update).await.unwrap();
    assert_eq!(edited.weight_lb, dec!(7.125));
    assert_eq!(db::boxes::get(&pool, b.id).await.unwrap().weight_lb, dec!(7.125));
}

#[tokio::test]
async fn client_with_packages_cannot_be_deleted() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let busy = common::client(&pool, "VE").await;
    common::package(&pool, busy.id, Decimal::ONE).await;
    let err = db::clients::delete(&pool, busy.id).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::ClientHasDependents);

    let idle = common::client(&pool, "VE").await;
    db::clients::delete(&pool, idle.id).await.unwrap();
    assert!(db::clients::find(&pool, idle.id).await.unwrap().is_none());
}

async fn partner(pool: &sqlx::PgPool) -> i64 {
    let email = format!("{}@portal.test", common::unique("partner"));
    db::users::create(pool, &email, "unused-hash", "Partner", Role::PartnerAdmin, None)
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn manager_reassignment_follows_into_shipments() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let first = partner(&pool).await;
    let second = partner(&pool).await;

    let client = db::clients::create(&pool, &common::client_payload("VE"), Some(first), None)
        .await
        .unwrap();
    let b = common::closed_box(&pool, client.id, BoxType::Comercial).await;
    let shipment = db::shipments::create(&pool, &[b.id]).await.unwrap();
    assert_eq!(shipment.manager_uids, vec![first]);

    let reassign = ClientUpdate {
        manager_uid: Some(second),
        ..Default::default()
    };
    let client = db::clients::update(&pool, client.id, &reassign, true).await.unwrap();
    assert_eq!(client.manager_uid, Some(second));
    let shipment = db::shipments::get(&pool, shipment.id).await.unwrap();
    assert_eq!(shipment.manager_uids, vec![second]);

    // Non-staff callers can't move the client
    let ignored = ClientUpdate {
        manager_uid: Some(first),
        ..Default::default()
    };
    let client = db::clients::update(&pool, client.id, &ignored, false).await.unwrap();
    assert_eq!(client.manager_uid, Some(second));

    let clear = ClientUpdate {
        clear_manager: true,
        ..Default::default()
    };
    let client = db::clients::update(&pool, client.id, &clear, true).await.unwrap();
    assert_eq!(client.manager_uid, None);
    let shipment = db::shipments::get(&pool, shipment.id).await.unwrap();
    assert!(shipment.manager_uids.is_empty());
}

#[tokio::test]
async fn manager_must_be_active_partner_admin() {
    let Some(pool) = common::pool().await else {
        return;
    };
    let email = format!("{}@portal.test", common::unique("op"));
    let operador = db::users::create(&pool, &email, "unused-hash", "Op", Role::Operador, None)
        .await
        .unwrap();
    let err = db::clients::create(&pool, &common::client_payload("VE"), Some(operador.id), None)
        .await
        .unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::ClientInvalidManager);

    let err = db::clients::create(&pool, &common::client_payload("VE"), Some(-1), None)
        .await
        .unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::ClientInvalidManager);

    let disabled = partner(&pool).await;
    db::users::set_active(&pool, disabled, false).await.unwrap();
    let client = common::client(&pool, "VE").await;
    let update = ClientUpdate {
        manager_uid: Some(disabled),
        ..Default::default()
    };
    let err = db::clients::update(&pool, client.id, &update, true).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::ClientInvalidManager);

    let both = ClientUpdate {
        manager_uid: Some(partner(&pool).await),
        clear_manager: true,
        ..Default::default()
    };
    let err = db::clients::update(&pool, client.id, &both, true).await.unwrap_err();
    assert_eq!(common::code_of(err), ErrorCode::InvalidRequest);
}
