use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::error;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::window;

use super::dom::DomHost;
use crate::engine::Ripples;

type Instance = Weak<RefCell<Ripples<DomHost>>>;
type FrameSlot = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Observes a running animation loop without keeping it alive.
pub struct FrameLoop(Weak<RefCell<Option<Closure<dyn FnMut()>>>>);

impl FrameLoop {
    /// False once the loop has stopped and its closure has been freed.
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// Starts the animation loop for `instance`.
///
/// The loop stops once the instance is destroyed or dropped, and the frame
/// closure is then freed.
pub fn start(instance: Instance) -> Result<FrameLoop, JsValue> {
    // The frame closure reschedules itself through `f`, so it holds the only
    // strong reference to its own slot.
    let f: FrameSlot = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if !tick(&instance) {
            release_after_frame(f.clone());
            return;
        }
        // schedule next
        if let Some(callback) = f.borrow().as_ref() {
            if let Err(err) = request_frame(callback) {
                error!(error = ?err, "requestAnimationFrame failed");
                release_after_frame(f.clone());
            }
        }
    }) as Box<dyn FnMut()>));

    if let Some(callback) = g.borrow().as_ref() {
        request_frame(callback)?;
    }
    Ok(FrameLoop(Rc::downgrade(&g)))
}

/// Drops the frame closure from a microtask, once its own invocation has
/// returned.
fn release_after_frame(slot: FrameSlot) {
    wasm_bindgen_futures::spawn_local(async move {
        slot.borrow_mut().take();
    });
}

/// Runs one frame. Returns whether the loop should continue.
fn tick(instance: &Instance) -> bool {
    let Some(instance) = instance.upgrade() else {
        return false;
    };
    // Borrowed elsewhere: skip this frame, try again on the next one.
    let Ok(mut ripples) = instance.try_borrow_mut() else {
        return true;
    };
    if ripples.is_destroyed() {
        return false;
    }
    match ripples.frame() {
        Ok(()) => true,
        Err(err) => {
            error!(error = %err, "frame failed, stopping render loop");
            false
        }
    }
}

fn request_frame(callback: &Closure<dyn FnMut()>) -> Result<i32, JsValue> {
    window()
        .ok_or_else(|| JsValue::from_str("no window"))?
        .request_animation_frame(callback.as_ref().unchecked_ref())
}
