use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;

/// Redraw rate limiting without any browser dependency.
///
/// At most one redraw is pending at a time, and a pending redraw never fires
/// sooner than `min_interval_ms` after the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct RedrawThrottle {
    min_interval_ms: f64,
    scheduled: bool,
    last_redraw_ms: f64,
}

impl RedrawThrottle {
    pub fn new(min_interval_ms: f64) -> Self {
        Self {
            min_interval_ms,
            scheduled: false,
            last_redraw_ms: f64::NEG_INFINITY,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn last_redraw_ms(&self) -> f64 {
        self.last_redraw_ms
    }

    /// Ask for a redraw at `now_ms`. Returns the delay to schedule it after,
    /// or `None` when one is already pending.
    pub fn request(&mut self, now_ms: f64) -> Option<f64> {
        if self.scheduled {
            return None;
        }
        self.scheduled = true;
        Some((self.min_interval_ms - (now_ms - self.last_redraw_ms)).max(0.0))
    }

    /// A redraw ran, scheduled or forced.
    pub fn mark_drawn(&mut self, now_ms: f64) {
        self.scheduled = false;
        self.last_redraw_ms = now_ms;
    }
}

/// Coalesces redraw requests into a throttled timeout followed by one
/// `requestAnimationFrame`.
///
/// Clones share the same pending state.
#[derive(Clone)]
pub struct RedrawScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    throttle: RefCell<RedrawThrottle>,
    redraw: Rc<dyn Fn()>,
    timeout: RefCell<Option<Timeout>>,
    raf_id: Cell<Option<i32>>,
    frame: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl RedrawScheduler {
    pub fn new(min_interval_ms: f64, redraw: impl Fn() + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            throttle: RefCell::new(RedrawThrottle::new(min_interval_ms)),
            redraw: Rc::new(redraw),
            timeout: RefCell::new(None),
            raf_id: Cell::new(None),
            frame: RefCell::new(None),
        });

        let inner_cb = Rc::downgrade(&inner);
        let frame = Closure::<dyn FnMut()>::new(move || {
            let Some(inner) = inner_cb.upgrade() else {
                return;
            };
            inner.raf_id.set(None);
            inner.throttle.borrow_mut().mark_drawn(js_sys::Date::now());
            let redraw = inner.redraw.clone();
            redraw();
        });
        *inner.frame.borrow_mut() = Some(frame);

        Self { inner }
    }

    /// Schedule a redraw unless one is already pending.
    pub fn request(&self) {
        let Some(delay) = self.inner.throttle.borrow_mut().request(js_sys::Date::now()) else {
            return;
        };
        let weak = Rc::downgrade(&self.inner);
        let timeout = Timeout::new(delay.ceil() as u32, move || {
            if let Some(inner) = weak.upgrade() {
                inner.timeout.borrow_mut().take();
                inner.request_frame();
            }
        });
        *self.inner.timeout.borrow_mut() = Some(timeout);
    }

    /// Redraw immediately, dropping any pending scheduled redraw.
    pub fn force(&self) {
        self.inner.cancel_pending();
        self.inner.throttle.borrow_mut().mark_drawn(js_sys::Date::now());
        let redraw = self.inner.redraw.clone();
        redraw();
    }

    pub fn is_scheduled(&self) -> bool {
        self.inner.throttle.borrow().is_scheduled()
    }
}

impl Inner {
    fn request_frame(&self) {
        let frame = self.frame.borrow();
        let requested = match (self.window.as_ref(), frame.as_ref()) {
            (Some(window), Some(cb)) => window
                .request_animation_frame(cb.as_ref().unchecked_ref())
                .ok(),
            _ => None,
        };
        drop(frame);
        match requested {
            Some(id) => self.raf_id.set(Some(id)),
            None => {
                // No frame will come; run synchronously so the request is not lost.
                self.throttle.borrow_mut().mark_drawn(js_sys::Date::now());
                let redraw = self.redraw.clone();
                redraw();
            }
        }
    }

    fn cancel_pending(&self) {
        // Dropping a gloo Timeout clears it.
        self.timeout.borrow_mut().take();
        if let Some(raf_id) = self.raf_id.replace(None)
            && let Some(window) = self.window.as_ref()
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel_pending();
        self.frame.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::RedrawThrottle;

    #[test]
    fn first_request_fires_immediately() {
        let mut throttle = RedrawThrottle::new(80.0);
        assert_eq!(throttle.request(1_000.0), Some(0.0));
        assert!(throttle.is_scheduled());
    }

    #[test]
    fn requests_while_scheduled_are_coalesced() {
        let mut throttle = RedrawThrottle::new(80.0);
        assert!(throttle.request(0.0).is_some());
        assert_eq!(throttle.request(5.0), None);
        assert_eq!(throttle.request(50.0), None);
        throttle.mark_drawn(60.0);
        assert!(!throttle.is_scheduled());
        assert_eq!(throttle.last_redraw_ms(), 60.0);
    }

    #[test]
    fn delay_is_remaining_interval() {
        let mut throttle = RedrawThrottle::new(80.0);
        throttle.mark_drawn(1_000.0);
        assert_eq!(throttle.request(1_030.0), Some(50.0));
        throttle.mark_drawn(1_080.0);
        assert_eq!(throttle.request(1_500.0), Some(0.0));
    }

    #[test]
    fn forced_draw_clears_pending_flag() {
        let mut throttle = RedrawThrottle::new(80.0);
        throttle.request(10.0);
        throttle.mark_drawn(12.0);
        assert_eq!(throttle.request(20.0), Some(72.0));
    }

    #[test]
    fn sustained_requests_stay_under_rate_limit() {
        let mut throttle = RedrawThrottle::new(80.0);
        let mut pending_at: Option<f64> = None;
        let mut draws = Vec::new();
        // A pointer-move every 4 ms for one second.
        for step in 0..250 {
            let now = step as f64 * 4.0;
            if let Some(at) = pending_at
                && at <= now
            {
                throttle.mark_drawn(at);
                draws.push(at);
                pending_at = None;
            }
            if let Some(delay) = throttle.request(now) {
                pending_at = Some(now + delay);
            }
        }
        assert!(draws.windows(2).all(|w| w[1] - w[0] >= 80.0));
        assert!(draws.len() >= 10);
    }
}
