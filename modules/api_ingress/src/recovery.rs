//! Fault recovery: turns a panic anywhere inside the pipeline into a generic
//! internal-error response plus one error log line with the panic location
//! and a captured backtrace.
//!
//! The panic hook records the report on the panicking thread; the middleware
//! picks it up right after `catch_unwind` returns on that same thread.
//! Panics outside a guarded request fall through to the previous hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use futures::FutureExt;
use tracing::error;

use crate::error::internal_error;
use crate::request_id::{self, XRequestId};

#[derive(Debug, Clone)]
pub struct PanicReport {
    pub message: String,
    pub location: String,
    pub backtrace: String,
}

thread_local! {
    static GUARD_DEPTH: Cell<u32> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
}

/// Install the capturing panic hook. Idempotent.
pub fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }
            let report = PanicReport {
                message: payload_message(info.payload()),
                location: info
                    .location()
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                backtrace: Backtrace::force_capture().to_string(),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(report));
        }));
    });
}

/// Report left by the hook for the most recent guarded panic on this thread.
pub fn take_report() -> Option<PanicReport> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

struct GuardScope;

impl GuardScope {
    fn enter() -> Self {
        GUARD_DEPTH.with(|d| d.set(d.get() + 1));
        GuardScope
    }
}

impl Drop for GuardScope {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Marks every poll of the inner future as guarded for the panic hook.
struct Guarded<F> {
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for Guarded<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _scope = GuardScope::enter();
        self.inner.as_mut().poll(cx)
    }
}

pub async fn catch_panic(req: Request<Body>, next: Next) -> Response {
    let rid = req
        .extensions()
        .get::<XRequestId>()
        .map(|XRequestId(id)| id.clone())
        .unwrap_or_else(|| request_id::from_headers(req.headers()).to_owned());
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let guarded = Guarded {
        inner: Box::pin(next.run(req)),
    };

    match AssertUnwindSafe(guarded).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let report = take_report().unwrap_or_else(|| PanicReport {
                message: payload_message(&*payload),
                location: "unknown".to_string(),
                backtrace: "unavailable (panic hook not installed)".to_string(),
            });
            error!(
                request_id = %rid,
                %method,
                %path,
                panic.message = %report.message,
                panic.location = %report.location,
                backtrace = %report.backtrace,
                "recovered from panic while handling request"
            );
            internal_error(&rid)
        }
    }
}
