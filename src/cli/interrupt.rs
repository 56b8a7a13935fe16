//! SIGINT handling.
//!
//! An interrupted run exits 1 right away. The partial staging directory is
//! left behind and cleared by the next run.

#[cfg(unix)]
const MESSAGE: &[u8] =
    b"\nInterrupted: support bundle generation stopped, partial output discarded\n";

#[cfg(unix)]
extern "C" fn on_sigint(_signal: libc::c_int) {
    // SAFETY: write(2) and _exit(2) are async-signal-safe.
    unsafe {
        libc::write(libc::STDERR_FILENO, MESSAGE.as_ptr().cast(), MESSAGE.len());
        libc::_exit(1);
    }
}

#[cfg(unix)]
pub(crate) fn install() -> anyhow::Result<()> {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    let action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handler only calls async-signal-safe functions.
    unsafe { sigaction(Signal::SIGINT, &action) }?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn install() -> anyhow::Result<()> {
    Ok(())
}
