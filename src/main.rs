//! PointMoney entry point
//!
//! On the web this wires LocalStorage and window events into the stores.
//! Natively it runs the stores over an in-memory medium as a smoke check.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web_app {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pointmoney::platform::web::{self, WebBridge};
    use pointmoney::{App, StorageConfig};

    thread_local! {
        // Lives for the whole tab
        static APP: RefCell<Option<(App, WebBridge)>> = const { RefCell::new(None) };
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("PointMoney storage starting...");

        let app = match App::in_browser(StorageConfig::default()) {
            Ok(app) => app,
            Err(e) => {
                log::error!("LocalStorage unavailable: {e}");
                return;
            }
        };
        let bridge = match web::install(Rc::clone(&app.storage)) {
            Ok(bridge) => bridge,
            Err(e) => {
                log::error!("Failed to install sync bridge: {e:?}");
                return;
            }
        };

        // Push persisted state to listeners mounted before us
        app.storage.sync();

        APP.with(|slot| *slot.borrow_mut() = Some((app, bridge)));
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    web_app::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("PointMoney (native) starting...");
    log::info!("Native mode uses an in-memory medium - build for wasm32 for LocalStorage");

    println!("\nRunning store smoke check...");
    smoke_check();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn smoke_check() {
    use std::rc::Rc;

    use pointmoney::platform::{MemoryMedium, SystemClock};
    use pointmoney::stores::{NewTransaction, NewWithdrawal, Registration};
    use pointmoney::types::{PaymentDetails, PaymentMethod, TransactionType, WithdrawalStatus};
    use pointmoney::{App, StorageConfig};

    let medium = Rc::new(MemoryMedium::new());
    let tab_a = App::new(medium.clone(), Rc::new(SystemClock), StorageConfig::default());
    let tab_b = App::new(medium.clone(), Rc::new(SystemClock), StorageConfig::default());

    let worker = tab_a
        .auth
        .register_user(Registration {
            login_id: "worker1".to_string(),
            password: "pass1234".to_string(),
            name: "Worker One".to_string(),
            email: "worker1@example.com".to_string(),
        })
        .expect("registration failed");
    let admin = tab_a
        .auth
        .sign_in("admin", "admin123")
        .expect("admin sign-in failed");

    tab_a.points.add_transaction(NewTransaction {
        worker_id: worker.id.clone(),
        worker_name: worker.name.clone(),
        admin_id: admin.id.clone(),
        admin_name: admin.name.clone(),
        amount: 1_000,
        kind: TransactionType::Add,
        reason: "Welcome bonus".to_string(),
    });
    let persisted = tab_a
        .auth
        .update_user_points(&worker.id, 1_000)
        .expect("point update failed");
    assert!(persisted, "point update was not persisted");

    let request = tab_a.withdrawals.add_request(NewWithdrawal {
        worker_id: worker.id.clone(),
        worker_name: worker.name.clone(),
        amount: 500,
        payment_method: PaymentMethod::PayPay,
        payment_details: PaymentDetails {
            paypay_id: Some("worker1-pay".to_string()),
            ..PaymentDetails::default()
        },
    });
    tab_a.withdrawals.update_status(
        &request.id,
        WithdrawalStatus::Completed,
        &admin.id,
        &admin.name,
        Some("Paid out"),
    );

    // Tab B only learns about tab A's writes through the medium's change notifications
    let prefix = &tab_b.storage.config().prefix;
    for key in medium.keys().iter().filter(|k| k.starts_with(prefix.as_str())) {
        tab_b
            .storage
            .apply_external_change(Some(key.as_str()), medium.raw_get(key).as_deref());
    }

    assert_eq!(tab_b.points.transactions().len(), 1);
    assert_eq!(tab_b.withdrawals.pending_requests().len(), 0);
    assert!(tab_b.credentials.verify("worker1", "pass1234"));
    assert_eq!(tab_b.auth.get_user("worker1").map(|u| u.points), Some(1_000));

    let stats = tab_a.storage.cache_stats();
    println!(
        "✓ Store smoke check passed! ({} keys, cache hit rate {:.0}%)",
        medium.len(),
        stats.hit_rate() * 100.0
    );
}
