//! Browser bindings (wasm32 only).
//!
//! [`ScriptPrototypeHost`] replaces `HTMLScriptElement.prototype.src` with
//! a configurable, non-enumerable accessor backed by the `_src` field, and
//! [`BlobResourceStore`] turns synthesized scripts into `blob:` URLs.

use crate::config::StubConfig;
use crate::dom::{AccessorHost, ScriptElement, SourceAccessor, SHADOW_SRC_FIELD};
use crate::interceptor::SourceInterceptor;
use crate::result::{StubError, StubResult};
use crate::synth::ResourceStore;
use js_sys::Reflect;
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

const DESCRIPTOR_FACTORY: &str = "return { configurable: true, enumerable: false, \
     get() { return get(this); }, set(value) { set(this, value); } };";

thread_local! {
    /// Set once the page prototype carries the interceptor's accessor
    static PROTOTYPE_PATCHED: Cell<bool> = const { Cell::new(false) };
}

fn refused(message: impl Into<String>) -> StubError {
    StubError::InstallRefused {
        message: message.into(),
    }
}

/// A script element reached through `this` inside the accessor
struct WebScriptElement {
    object: JsValue,
}

impl ScriptElement for WebScriptElement {
    fn shadow_src(&self) -> Option<String> {
        Reflect::get(&self.object, &JsValue::from_str(SHADOW_SRC_FIELD))
            .ok()
            .and_then(|v| v.as_string())
    }

    fn set_shadow_src(&mut self, value: String) {
        if let Err(e) = Reflect::set(
            &self.object,
            &JsValue::from_str(SHADOW_SRC_FIELD),
            &JsValue::from_str(&value),
        ) {
            tracing::debug!(error = ?e, "could not store script source field");
        }
    }

    fn set_src_attribute(&mut self, value: &str) {
        if let Some(element) = self.object.dyn_ref::<web_sys::Element>() {
            if let Err(e) = element.set_attribute("src", value) {
                tracing::debug!(error = ?e, "could not set script src attribute");
            }
        }
    }
}

fn script_prototype() -> StubResult<js_sys::Object> {
    let window: JsValue = web_sys::window()
        .ok_or_else(|| refused("no global window"))?
        .into();
    let constructor = Reflect::get(&window, &JsValue::from_str("HTMLScriptElement"))
        .map_err(|e| refused(format!("HTMLScriptElement unavailable: {e:?}")))?;
    Reflect::get(&constructor, &JsValue::from_str("prototype"))
        .map_err(|e| refused(format!("HTMLScriptElement.prototype unavailable: {e:?}")))?
        .dyn_into::<js_sys::Object>()
        .map_err(|_| refused("HTMLScriptElement.prototype is not an object"))
}

/// Accessor host for the page's `HTMLScriptElement.prototype`
///
/// The prototype is shared by every interceptor in the page, so a second
/// definition on the same thread fails with [`StubError::AlreadyInstalled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptPrototypeHost;

impl AccessorHost for ScriptPrototypeHost {
    fn define_src_accessor(&mut self, accessor: SourceAccessor) -> StubResult<()> {
        if PROTOTYPE_PATCHED.with(Cell::get) {
            return Err(StubError::AlreadyInstalled);
        }
        let prototype = script_prototype()?;

        let get_accessor = accessor.clone();
        let getter = Closure::wrap(Box::new(move |this: JsValue| -> JsValue {
            JsValue::from_str(&get_accessor.get(&WebScriptElement { object: this }))
        }) as Box<dyn Fn(JsValue) -> JsValue>);

        let setter = Closure::wrap(Box::new(move |this: JsValue, value: JsValue| {
            // Non-string assignments are treated as empty sources
            let src = value.as_string().unwrap_or_default();
            accessor.set(&mut WebScriptElement { object: this }, &src);
        }) as Box<dyn Fn(JsValue, JsValue)>);

        let factory = js_sys::Function::new_with_args("get, set", DESCRIPTOR_FACTORY);
        let descriptor = factory
            .call2(&JsValue::NULL, getter.as_ref(), setter.as_ref())
            .map_err(|e| refused(format!("descriptor construction failed: {e:?}")))?
            .unchecked_into::<js_sys::Object>();

        let defined = Reflect::define_property(&prototype, &JsValue::from_str("src"), &descriptor)
            .map_err(|e| refused(format!("defineProperty threw: {e:?}")))?;
        if !defined {
            return Err(refused("HTMLScriptElement.prototype.src is not configurable"));
        }

        // The prototype now owns the JS side of both closures
        getter.forget();
        setter.forget();
        PROTOTYPE_PATCHED.with(|patched| patched.set(true));
        Ok(())
    }
}

/// Resource store backed by `Blob` and `URL.createObjectURL`
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobResourceStore;

impl ResourceStore for BlobResourceStore {
    fn create(&self, content: &str, content_type: &str) -> StubResult<String> {
        let options = web_sys::BlobPropertyBag::new();
        options.set_type(content_type);

        let blob_parts = js_sys::Array::new();
        blob_parts.push(&JsValue::from_str(content));

        let blob = web_sys::Blob::new_with_blob_sequence_and_options(&blob_parts, &options)
            .map_err(|e| StubError::ResourceCreation {
                message: format!("Blob construction failed: {e:?}"),
            })?;

        web_sys::Url::create_object_url_with_blob(&blob).map_err(|e| StubError::ResourceCreation {
            message: format!("createObjectURL failed: {e:?}"),
        })
    }

    fn revoke(&self, url: &str) {
        if let Err(e) = web_sys::Url::revoke_object_url(url) {
            tracing::debug!(url, error = ?e, "revokeObjectURL failed");
        }
    }
}

/// Build an interceptor producing `blob:` URLs and install it on the page
///
/// Install failures are reported through `tracing`; check
/// [`SourceInterceptor::is_installed`] to see whether it took effect.
#[must_use]
pub fn install_page_interceptor(config: StubConfig) -> SourceInterceptor {
    let interceptor = SourceInterceptor::builder()
        .config(config)
        .store(Rc::new(BlobResourceStore))
        .build();
    interceptor.install(&mut ScriptPrototypeHost);
    interceptor
}
