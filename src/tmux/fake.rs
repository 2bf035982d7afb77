// In-memory tmux server for tests. Interprets the subset of the CLI that
// `Tmux` issues and keeps per-session pane state.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::Tmux;
use crate::external::{CommandError, CommandExecutor, CommandOutput};

#[derive(Debug, Clone)]
struct FakeSession {
    pid: u32,
    dead: bool,
    remain_on_exit: bool,
    hook: Option<String>,
    respawns: u32,
    command: Option<String>,
}

#[derive(Debug, Default)]
struct ServerState {
    socket: String,
    sessions: HashMap<String, FakeSession>,
    next_pid: u32,
    calls: Vec<Vec<String>>,
    failing: HashSet<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeTmuxServer {
    state: Arc<Mutex<ServerState>>,
}

impl FakeTmuxServer {
    pub fn new(socket: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                socket: socket.to_string(),
                next_pid: 1000,
                ..Default::default()
            })),
        }
    }

    pub fn tmux(&self) -> Tmux {
        let socket = self.state.lock().unwrap().socket.clone();
        self.tmux_on_socket(&socket)
    }

    pub fn tmux_on_socket(&self, socket: &str) -> Tmux {
        Tmux::with_executor(socket, Arc::new(self.clone()))
    }

    pub fn add_session(&self, name: &str, pid: u32) {
        self.state.lock().unwrap().sessions.insert(
            name.to_string(),
            FakeSession {
                pid,
                dead: false,
                remain_on_exit: false,
                hook: None,
                respawns: 0,
                command: None,
            },
        );
    }

    pub fn kill_process(&self, name: &str) {
        if let Some(s) = self.state.lock().unwrap().sessions.get_mut(name) {
            s.dead = true;
        }
    }

    pub fn fail_subcommand(&self, sub: &str) {
        self.state.lock().unwrap().failing.insert(sub.to_string());
    }

    pub fn remain_on_exit(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(name)
            .map(|s| s.remain_on_exit)
            .unwrap_or(false)
    }

    pub fn hook(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(name)
            .and_then(|s| s.hook.clone())
    }

    pub fn respawn_count(&self, name: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(name)
            .map(|s| s.respawns)
            .unwrap_or(0)
    }

    pub fn launch_command(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(name)
            .and_then(|s| s.command.clone())
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().calls.clone()
    }

    fn handle(&self, args: &[&str]) -> CommandOutput {
        let mut state = self.state.lock().unwrap();
        state.calls.push(args.iter().map(|a| a.to_string()).collect());

        let (socket, rest) = match args {
            ["-L", socket, rest @ ..] => (*socket, rest),
            rest => ("", rest),
        };
        if socket != state.socket {
            return fail("no server running");
        }
        let Some((sub, rest)) = rest.split_first() else {
            return fail("no command");
        };
        if state.failing.contains(*sub) {
            return fail("injected failure");
        }

        let target = flag_value(rest, "-t").unwrap_or_default();
        if *sub == "kill-session" {
            return match state.sessions.remove(target) {
                Some(_) => ok(""),
                None => fail("can't find session"),
            };
        }

        let next_pid = state.next_pid;
        let Some(session) = state.sessions.get_mut(target) else {
            return fail(&format!("can't find session: {target}"));
        };

        match *sub {
            "list-panes" => ok(if session.dead { "1\n" } else { "0\n" }),
            "display-message" => ok(&format!("{}\n", session.pid)),
            "has-session" => ok(""),
            "set-option" => {
                session.remain_on_exit = rest.last() == Some(&"on");
                ok("")
            }
            "set-hook" => {
                session.hook = rest.last().map(|h| h.to_string());
                ok("")
            }
            "respawn-pane" => {
                if !session.dead && !rest.contains(&"-k") {
                    return fail("pane still active");
                }
                session.dead = false;
                session.pid = next_pid;
                session.respawns += 1;
                let positional: Vec<&str> = positional_args(rest);
                if let Some(cmd) = positional.first() {
                    session.command = Some(cmd.to_string());
                }
                state.next_pid += 1;
                ok("")
            }
            other => fail(&format!("unknown command: {other}")),
        }
    }
}

#[async_trait]
impl CommandExecutor for FakeTmuxServer {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        if program != "tmux" {
            return Err(CommandError::CommandNotFound {
                command: program.to_string(),
            });
        }
        Ok(self.handle(args))
    }
}

fn flag_value<'a>(args: &[&'a str], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| *a == flag)
        .and_then(|i| args.get(i + 1))
        .copied()
}

/// Arguments that are neither flags nor flag values (`-t <target>`).
fn positional_args<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for a in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if *a == "-t" {
            skip_next = true;
        } else if !a.starts_with('-') {
            out.push(*a);
        }
    }
    out
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        status_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn fail(stderr: &str) -> CommandOutput {
    CommandOutput {
        status_code: 1,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}
