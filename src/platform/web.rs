//! Browser window event bridge
//!
//! - Window `storage` events (another tab wrote LocalStorage) are handed to
//!   `StorageManager::apply_external_change`.
//! - Every `SyncEvent` is re-dispatched on `window` as a `storageSync`
//!   `CustomEvent` with `{key, value}` and a `zustand-<namespace>` event
//!   with `{value}` for front-end store bindings.

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, CustomEventInit, StorageEvent, Window};

use crate::consts::SYNC_EVENT;
use crate::persistence::StorageManager;
use crate::sync::{Subscription, SyncEvent};

/// Keeps the installed listeners alive; dropping it detaches them
pub struct WebBridge {
    window: Window,
    storage: Rc<StorageManager>,
    on_storage: Closure<dyn FnMut(StorageEvent)>,
    subscription: Subscription,
}

/// Wire `storage` up to the window
pub fn install(storage: Rc<StorageManager>) -> Result<WebBridge, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

    let target = Rc::downgrade(&storage);
    let on_storage = Closure::<dyn FnMut(_)>::new(move |event: StorageEvent| {
        if let Some(storage) = target.upgrade() {
            storage.apply_external_change(event.key().as_deref(), event.new_value().as_deref());
        }
    });
    window.add_event_listener_with_callback("storage", on_storage.as_ref().unchecked_ref())?;

    let dispatch_window = window.clone();
    let subscription = storage.bus().subscribe_all(move |event| {
        if let Err(e) = dispatch(&dispatch_window, event) {
            log::warn!("Failed to dispatch sync event: {e:?}");
        }
    });

    log::info!("Storage sync bridge installed");
    Ok(WebBridge {
        window,
        storage,
        on_storage,
        subscription,
    })
}

fn dispatch(window: &Window, event: &SyncEvent) -> Result<(), JsValue> {
    dispatch_custom(window, SYNC_EVENT, &event.detail().to_string())?;
    dispatch_custom(
        window,
        &event.store_event_name(),
        &event.store_event_detail().to_string(),
    )
}

fn dispatch_custom(window: &Window, name: &str, detail_json: &str) -> Result<(), JsValue> {
    let detail = js_sys::JSON::parse(detail_json)?;
    let init = CustomEventInit::new();
    init.set_detail(&detail);
    let event = CustomEvent::new_with_event_init_dict(name, &init)?;
    window.dispatch_event(&event)?;
    Ok(())
}

impl Drop for WebBridge {
    fn drop(&mut self) {
        let _ = self.window.remove_event_listener_with_callback(
            "storage",
            self.on_storage.as_ref().unchecked_ref(),
        );
        self.storage.bus().unsubscribe(self.subscription);
    }
}
