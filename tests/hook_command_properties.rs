// Property-based tests for the pane-died hook text.
// Any valid session and socket name must yield a hook that is a single
// single-quoted run-shell argument carrying the recheck and the respawn.

use pane_warden::tmux::{build_auto_respawn_hook_cmd, Tmux};
use proptest::prelude::*;

fn session_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_][A-Za-z0-9_-]{0,30}"
}

fn socket_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[A-Za-z0-9_][A-Za-z0-9_.-]{0,20}",
    ]
}

proptest! {
    #[test]
    fn hook_is_one_background_run_shell(session in session_strategy(), socket in socket_strategy()) {
        let prefix = Tmux::with_socket(socket).command_prefix();
        let hook = build_auto_respawn_hook_cmd(&prefix, &session);

        let run_shell = "run-shell -b '";
        prop_assert!(hook.starts_with(run_shell));
        prop_assert!(hook.ends_with("|| true'"));
        // The only single quotes are the ones delimiting the shell command.
        prop_assert_eq!(hook.matches('\'').count(), 2);
        prop_assert!(!hook[run_shell.len()..hook.len() - 1].contains('\''));
    }

    #[test]
    fn recheck_and_respawn_use_the_same_server(session in session_strategy(), socket in socket_strategy()) {
        let prefix = Tmux::with_socket(socket.clone()).command_prefix();
        let hook = build_auto_respawn_hook_cmd(&prefix, &session);

        let recheck = format!("$({prefix} list-panes -t \"{session}\" -F \"##{{pane_dead}}\"");
        let respawn = format!("{prefix} respawn-pane -k -t \"{session}\"");
        prop_assert!(hook.contains(&recheck), "missing recheck in {}", hook);
        prop_assert!(hook.contains(&respawn), "missing respawn in {}", hook);
        prop_assert!(hook.find(&recheck) < hook.find(&respawn));

        let socket_flag = format!("-L {socket}");
        if socket.is_empty() {
            prop_assert!(!hook.contains("-L "));
        } else {
            prop_assert_eq!(hook.matches(socket_flag.as_str()).count(), 2);
        }
    }

    #[test]
    fn respawn_is_guarded_by_grace_and_dead_check(session in session_strategy()) {
        let hook = build_auto_respawn_hook_cmd("tmux -L gt", &session);

        let sleep = hook.find("sleep 3 && ").expect("grace sleep");
        let guard = hook.find("= 1 ] && ").expect("dead guard");
        let respawn = hook.find("respawn-pane -k").expect("respawn");
        prop_assert!(sleep < guard && guard < respawn);
        prop_assert!(hook.contains(">/dev/null 2>&1 || true'"));
    }
}
