//! Domain stores kept in step across tabs

use std::rc::Rc;

use pointmoney::platform::{ManualClock, MemoryMedium};
use pointmoney::stores::{NewTransaction, NewWithdrawal, Registration};
use pointmoney::types::{PaymentDetails, PaymentMethod, TransactionType, WithdrawalStatus};
use pointmoney::{App, Namespace, StorageConfig};

struct Tabs {
    medium: Rc<MemoryMedium>,
    a: App,
    b: App,
}

impl Tabs {
    fn open() -> Self {
        let medium = Rc::new(MemoryMedium::new());
        let clock = ManualClock::new(1_714_555_800_000.0);
        let a = App::new(medium.clone(), Rc::new(clock.clone()), StorageConfig::default());
        let b = App::new(medium.clone(), Rc::new(clock), StorageConfig::default());
        Self { medium, a, b }
    }

    /// Deliver the browser's `storage` notification for `namespace` to tab B
    fn notify_b(&self, namespace: Namespace) {
        let key = self.b.storage.config().physical_key(namespace);
        self.b
            .storage
            .apply_external_change(Some(key.as_str()), self.medium.raw_get(&key).as_deref());
    }
}

fn grant(amount: i64) -> NewTransaction {
    NewTransaction {
        worker_id: "worker1".to_string(),
        worker_name: "Worker One".to_string(),
        admin_id: "admin".to_string(),
        admin_name: "管理者".to_string(),
        amount,
        kind: TransactionType::Add,
        reason: "overtime".to_string(),
    }
}

#[test]
fn test_point_ledger_reaches_other_tab() {
    let tabs = Tabs::open();
    let tx = tabs.a.points.add_transaction(grant(250));
    assert!(tabs.b.points.transactions().is_empty());

    tabs.notify_b(Namespace::Points);
    assert_eq!(tabs.b.points.transactions(), vec![tx]);
}

#[test]
fn test_registration_reaches_other_tab() {
    let tabs = Tabs::open();
    tabs.a
        .auth
        .register_user(Registration {
            login_id: "worker1".to_string(),
            password: "pw".to_string(),
            name: "Worker One".to_string(),
            email: "worker1@example.com".to_string(),
        })
        .unwrap();

    assert!(tabs.b.auth.sign_in("worker1", "pw").is_err());

    tabs.notify_b(Namespace::Credentials);
    tabs.notify_b(Namespace::Auth);
    let user = tabs.b.auth.sign_in("worker1", "pw").unwrap();
    assert_eq!(user.email, "worker1@example.com");
}

#[test]
fn test_concurrent_edits_last_write_wins() {
    let tabs = Tabs::open();
    let request = NewWithdrawal {
        worker_id: "worker1".to_string(),
        worker_name: "Worker One".to_string(),
        amount: 400,
        payment_method: PaymentMethod::Crypto,
        payment_details: PaymentDetails {
            crypto_address: Some("0xabc".to_string()),
            ..PaymentDetails::default()
        },
    };

    // Both tabs edit from the same (empty) state without seeing each other
    let from_a = tabs.a.withdrawals.add_request(request.clone());
    let from_b = tabs.b.withdrawals.add_request(request);

    // B wrote last, so A's request is gone from the medium
    tabs.a
        .storage
        .apply_external_change(
            Some("pointmoney_withdrawal-storage"),
            tabs.medium.raw_get("pointmoney_withdrawal-storage").as_deref(),
        );
    let ids: Vec<String> = tabs.a.withdrawals.requests().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![from_b.id]);
    assert!(!ids.contains(&from_a.id));
}

#[test]
fn test_status_update_reaches_other_tab() {
    let tabs = Tabs::open();
    let request = tabs.a.withdrawals.add_request(NewWithdrawal {
        worker_id: "worker1".to_string(),
        worker_name: "Worker One".to_string(),
        amount: 100,
        payment_method: PaymentMethod::Bank,
        payment_details: PaymentDetails::default(),
    });
    tabs.notify_b(Namespace::Withdrawals);
    assert_eq!(tabs.b.withdrawals.pending_requests().len(), 1);

    assert!(tabs.b.withdrawals.update_status(
        &request.id,
        WithdrawalStatus::Rejected,
        "admin",
        "管理者",
        Some("insufficient balance"),
    ));
    tabs.a
        .storage
        .apply_external_change(
            Some("pointmoney_withdrawal-storage"),
            tabs.medium.raw_get("pointmoney_withdrawal-storage").as_deref(),
        );

    let seen_by_a = tabs.a.withdrawals.requests_by_worker("worker1");
    assert_eq!(seen_by_a[0].status, WithdrawalStatus::Rejected);
    assert!(tabs.a.withdrawals.pending_requests().is_empty());
}

#[test]
fn test_sync_rehydrates_fresh_store_listeners() {
    let tabs = Tabs::open();
    tabs.a.points.add_transaction(grant(10));

    // A third tab opened later sees persisted state on construction
    let c = App::with_storage(Rc::new(pointmoney::StorageManager::with_medium(
        tabs.medium.clone(),
    )));
    assert_eq!(c.points.transactions().len(), 1);

    // And `sync` pushes it to tab B without any write
    tabs.b.storage.sync();
    assert_eq!(tabs.b.points.transactions().len(), 1);
}

#[test]
fn test_quota_exceeded_keeps_memory_state() {
    let medium = Rc::new(MemoryMedium::with_quota(600));
    let app = App::new(medium.clone(), Rc::new(ManualClock::new(0.0)), StorageConfig::default());

    let mut persisted = Vec::new();
    for _ in 0..5 {
        app.points.add_transaction(grant(1));
        let stored = app
            .storage
            .get("point-storage", serde_json::json!({"transactions": []}));
        persisted.push(stored["transactions"].as_array().map_or(0, Vec::len));
    }

    // Memory keeps every transaction even after the medium fills up
    assert_eq!(app.points.transactions().len(), 5);
    assert!(persisted.last().copied().unwrap_or(0) < 5);
}
