//! Browser entry: hydrate the list and wire up the add-item form.

use isomorph_client::{Dispatch, HydrationClient, SharedMount, WebDom};
use tracing::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, HtmlInputElement};

use crate::{mount_point, ViewState, FORM_ID};

fn js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    let dom = WebDom::from_window().ok_or_else(|| js("no document"))?;
    let document = dom.document().clone();
    let mount = HydrationClient::new(dom).hydrate::<ViewState>(&mount_point()).map_err(js)?;
    let shared = SharedMount::new(mount);
    info!(mount = crate::MOUNT_ID, "hydrated");

    let form = document
        .get_element_by_id(FORM_ID)
        .ok_or_else(|| js(format!("no #{FORM_ID}")))?;
    let input: HtmlInputElement = form
        .query_selector("input")?
        .ok_or_else(|| js("form has no input"))?
        .dyn_into()?;

    let on_submit = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        event.prevent_default();
        let value = input.value();
        input.set_value("");
        let outcome = shared.dispatch(move |state: &mut ViewState| {
            state.add(&value);
        });
        match outcome {
            Ok(Dispatch::Applied(patch)) => debug!(ops = patch.len(), "item added"),
            Ok(Dispatch::Queued) => debug!("item queued"),
            Ok(Dispatch::Rejected) => warn!("item dropped; list is busy"),
            Err(err) => error!(%err, "could not apply new item"),
        }
    });
    form.add_event_listener_with_callback("submit", on_submit.as_ref().unchecked_ref())?;
    // The listener lives as long as the page.
    on_submit.forget();
    Ok(())
}
