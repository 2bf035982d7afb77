//! Text of the `pane-died` hook.
//!
//! The hook is executed by tmux's own event engine, outside this process and
//! possibly long after the daemon that installed it has gone. It therefore
//! has to carry its whole recovery protocol inline:
//!
//! 1. `run-shell -b` so nothing it prints reaches an attached client.
//! 2. Sleep the grace window, letting a faster recoverer (the daemon) win.
//! 3. Re-read `pane_dead`; if the pane is alive again, do nothing.
//! 4. Otherwise `respawn-pane -k`, which re-runs the original command.
//! 5. `|| true` so the hook always exits 0 and tmux logs nothing.
//!
//! The recheck only guarantees that a pane found alive is never killed. A
//! respawn landing between the recheck and the `respawn-pane` can still be
//! restarted once more; that window is accepted.

use std::time::Duration;

/// How long the hook waits before rechecking the pane.
pub const AUTO_RESPAWN_GRACE: Duration = Duration::from_secs(3);

/// Build the hook command for `session` using the default grace window.
///
/// `tmux_cmd` is the invocation prefix, `tmux` or `tmux -L <socket>`. It is
/// embedded verbatim in both the recheck and the respawn; with a bare `tmux`
/// inside a socket-scoped setup the respawn would hit the default server and
/// silently do nothing.
pub fn build_auto_respawn_hook_cmd(tmux_cmd: &str, session: &str) -> String {
    build_auto_respawn_hook_cmd_with_grace(tmux_cmd, session, AUTO_RESPAWN_GRACE)
}

pub fn build_auto_respawn_hook_cmd_with_grace(
    tmux_cmd: &str,
    session: &str,
    grace: Duration,
) -> String {
    // `##` survives run-shell's format expansion as a literal `#`, so the
    // pane state is read when the shell runs, not when the hook fires.
    format!(
        "run-shell -b '\
sleep {grace} && \
[ \"$({tmux_cmd} list-panes -t \"{session}\" -F \"##{{pane_dead}}\" 2>/dev/null | head -n 1)\" = 1 ] && \
{tmux_cmd} respawn-pane -k -t \"{session}\" >/dev/null 2>&1 \
|| true'",
        grace = format_grace(grace),
    )
}

/// `sleep` argument for the grace window; fractional seconds are kept.
fn format_grace(grace: Duration) -> String {
    if grace.subsec_millis() == 0 {
        grace.as_secs().to_string()
    } else {
        format!("{:.3}", grace.as_secs_f64())
    }
}
