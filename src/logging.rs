//! Logging setup and the process-wide panic guard

use std::panic;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_DIRECTIVE: &str = "raw_culler=info";

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .try_init();
}

/// Route panics to the log. Panics on the UI thread also raise a native
/// error dialog; worker panics are only logged.
pub fn install_panic_guard() {
    panic::set_hook(Box::new(|info| {
        let message = panic_message(info.payload());
        let location = info.location().map_or_else(
            || "at an unknown location".to_string(),
            |loc| format!("at {}:{}:{}", loc.file(), loc.line(), loc.column()),
        );
        let thread = std::thread::current();
        tracing::error!(
            "💥 Panic on thread {} {} - {}",
            thread.name().unwrap_or("<unnamed>"),
            location,
            message
        );
        if shows_dialog(thread.name()) {
            crate::shell::show_error("Unexpected error", &format!("{}\n\n{}", message, location));
        }
    }));
}

/// Only the UI thread may block on a dialog
fn shows_dialog(thread_name: Option<&str>) -> bool {
    thread_name == Some("main")
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic payload");
    }

    #[test]
    fn test_dialog_only_on_the_ui_thread() {
        assert!(shows_dialog(Some("main")));
        assert!(!shows_dialog(Some("raw-culler-worker")));
        assert!(!shows_dialog(None));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
    }
}
