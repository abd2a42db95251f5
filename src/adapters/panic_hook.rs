//! Process Fault Handling - Log and Exit on Panic
//!
//! axum runs every connection on its own task, so a panic would otherwise
//! unwind only that task and leave the service running in an unknown
//! state. The hook logs the panic and terminates the process with exit
//! code 1.

use std::any::Any;
use std::panic;

use tracing::error;

/// Exit code used after an uncaught panic.
pub const PANIC_EXIT_CODE: i32 = 1;

/// Replace the panic hook with one that logs through `tracing`, runs the
/// previous hook, then exits the process.
pub fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |l| format!("{}:{}", l.file(), l.line()));
        error!(
            location = %location,
            panic = %panic_message(info.payload()),
            "Uncaught panic, terminating process"
        );
        previous(info);
        std::process::exit(PANIC_EXIT_CODE);
    }));
}

/// Text of a panic payload (`panic!` produces `&str` or `String`).
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use std::panic::UnwindSafe;
    use std::process::Command;

    use super::*;

    const CHILD_VAR: &str = "INTEL_UNIT_PANIC_CHILD";

    fn payload_of(f: impl FnOnce() + UnwindSafe) -> Box<dyn Any + Send> {
        panic::catch_unwind(f).unwrap_err()
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let payload = payload_of(|| panic!("static text"));
        assert_eq!(panic_message(payload.as_ref()), "static text");

        let code = 42;
        let payload = payload_of(move || panic!("formatted {code}"));
        assert_eq!(panic_message(payload.as_ref()), "formatted 42");

        let payload = payload_of(|| panic::panic_any(7_u8));
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    /// Re-runs itself in a child process; the child panics inside a
    /// spawned task, which must take the whole process down.
    #[test]
    fn panic_in_spawned_task_exits_process() {
        if std::env::var_os(CHILD_VAR).is_some() {
            install_panic_hook();
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let _ = tokio::spawn(async { panic!("handler fault") }).await;
            });
            std::process::exit(0);
        }

        let output = Command::new(std::env::current_exe().unwrap())
            .args([
                "--exact",
                "adapters::panic_hook::tests::panic_in_spawned_task_exits_process",
                "--test-threads=1",
                "--nocapture",
            ])
            .env(CHILD_VAR, "1")
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(PANIC_EXIT_CODE));
        assert!(String::from_utf8_lossy(&output.stderr).contains("handler fault"));
    }
}
