//! Test lifecycle contract between a test runner and a reporter.
//!
//! A runner describes each test with a [`TestDescriptor`] and fires the four
//! [`TestListener`] events around it. [`observe`] does this for a plain Rust
//! test body: it runs the body, reports the outcome, and re-raises any panic
//! so the verdict of the test itself is never changed by reporting.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, UnwindSafe};
use std::sync::OnceLock;

thread_local! {
    /// Trace captured by the panic hook on this thread, waiting to be claimed
    /// by [`TestFailure::from_panic`].
    static PANIC_SITE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Chain a panic hook that records where a panic was raised and its trace
/// while the panicking frames are still on the stack. The previous hook
/// still runs afterwards.
pub fn install_panic_hook() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|location| location.to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            let trace = format!(
                "panicked at {}\n{}",
                location,
                Backtrace::force_capture()
            );
            let _ = PANIC_SITE.try_with(|site| *site.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn take_panic_site() -> Option<String> {
    PANIC_SITE.with(|site| site.borrow_mut().take())
}

/// What a runner knows about one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDescriptor {
    pub class_name: String,
    pub method_name: String,
    /// Zephyr test case keys declared on the test, e.g. `PROJ-T1`.
    pub test_case_keys: Vec<String>,
    /// Set when the test is ignored; the text becomes the blocked comment.
    pub skip_reason: Option<String>,
}

impl TestDescriptor {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            test_case_keys: Vec::new(),
            skip_reason: None,
        }
    }

    pub fn with_test_case_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.test_case_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skip_reason(mut self, reason: impl Into<String>) -> Self {
        self.skip_reason = Some(reason.into());
        self
    }

    /// Registry key for this test: `class::method`.
    pub fn id(&self) -> String {
        format!("{}::{}", self.class_name, self.method_name)
    }

    /// Label used as the script/method line of a result comment.
    pub fn display_name(&self) -> String {
        format!("{} / {}()", self.class_name, self.method_name)
    }
}

impl fmt::Display for TestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Why a test failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFailure {
    pub message: String,
    pub stack_trace: String,
}

impl TestFailure {
    pub fn new(message: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_trace: stack_trace.into(),
        }
    }

    /// Build a failure from a caught panic payload. The trace is the one
    /// recorded at the panic site when [`install_panic_hook`] is active on
    /// this thread, otherwise it is captured here.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "test panicked with a non-string payload".to_string()
        };

        let stack_trace =
            take_panic_site().unwrap_or_else(|| Backtrace::force_capture().to_string());
        Self::new(message, stack_trace)
    }

    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        Self::new(message, Backtrace::force_capture().to_string())
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Callbacks a test runner fires around each test.
///
/// Takes `&self` so one listener can be shared by tests running on several
/// threads. The closing event for a test must be fired on the thread that
/// fired its `on_start`, as [`observe`] does.
pub trait TestListener: Send + Sync {
    fn on_start(&self, test: &TestDescriptor);

    fn on_success(&self, test: &TestDescriptor);

    fn on_failure(&self, test: &TestDescriptor, failure: &TestFailure);

    fn on_skip(&self, test: &TestDescriptor, reason: &str);
}

/// Run `body` as the test described by `test`, reporting to `listener`.
///
/// Returns `None` without running the body when the test carries a skip
/// reason. A panic in `body` is reported with the trace of the panic site and
/// then resumed.
pub fn observe<L, F, R>(listener: &L, test: &TestDescriptor, body: F) -> Option<R>
where
    L: TestListener + ?Sized,
    F: FnOnce() -> R + UnwindSafe,
{
    if let Some(reason) = &test.skip_reason {
        listener.on_skip(test, reason);
        return None;
    }

    install_panic_hook();
    take_panic_site();

    listener.on_start(test);
    match panic::catch_unwind(body) {
        Ok(value) => {
            listener.on_success(test);
            Some(value)
        }
        Err(payload) => {
            listener.on_failure(test, &TestFailure::from_panic(payload.as_ref()));
            panic::resume_unwind(payload)
        }
    }
}
