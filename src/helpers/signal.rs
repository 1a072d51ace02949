use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use super::types::Res;

static INTERRUPT_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_interrupt(_signal: libc::c_int) {
    if let Some(flag) = INTERRUPT_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Routes SIGINT and SIGTERM into a flag the read loop polls, so the
/// producer is torn down by its guard instead of the process dying mid-read.
pub fn install_interrupt_flag() -> Res<Arc<AtomicBool>> {
    let flag = INTERRUPT_FLAG
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone();

    let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
    for signal in [libc::SIGINT, libc::SIGTERM] {
        let previous = unsafe { libc::signal(signal, handler) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error().into());
        }
    }

    Ok(flag)
}
