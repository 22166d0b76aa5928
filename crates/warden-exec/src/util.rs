use std::io;

use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description,
};
use tokio::process::Child;

/// Asks the worker to stop. The proxy treats `SIGINT` as a clean shutdown request.
///
/// A worker that is already gone is not an error.
pub(crate) fn interrupt(child: &mut Child) -> io::Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            let Some(pid) = child.id() else {
                return Ok(());
            };
            // SAFETY: plain syscall on a pid we own and have not reaped yet.
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ESRCH) {
                Ok(())
            } else {
                Err(err)
            }
        } else {
            // No console control events for a piped child; terminate directly.
            child.start_kill()
        }
    }
}

const BANNER_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[[[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]]"
);

/// Local wall-clock prefix for console banners, in the proxy's own log style:
/// `[2021-04-28 09:12:27.231]`.
pub(crate) fn banner_timestamp() -> String {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc()
        .to_offset(offset)
        .format(BANNER_FORMAT)
        .unwrap_or_default()
}
