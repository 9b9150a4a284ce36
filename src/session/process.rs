//! Subprocess-backed solver session.
//!
//! The engine runs as a child process and is driven over its standard
//! streams with a line protocol:
//!
//! ```text
//! request:  <command>            or  <command>\t<payload>
//! reply:    OK  |  OK\t<data>    |  ERR\t<message>
//! ```
//!
//! Any other reply line is a malformed acknowledgment. Reply lines are read
//! on a dedicated thread and handed over a channel, so every round trip can
//! be bounded by [`SessionConfig::reply_timeout`].

use super::command::{Command, WindowKind};
use super::config::SessionConfig;
use super::registry::{self, InstanceHandle};
use super::SolverSession;
use crate::codec::COMMAND_OVERHEAD;
use crate::error::{ChannelError, SessionStartError};
use log::{debug, info, warn};
use std::io::{self, BufRead, BufReader, Write};
use std::process::{ChildStdin, Command as Process, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A live channel to one engine instance.
struct Channel {
    instance: InstanceHandle,
    pid: u32,
    stdin: Option<ChildStdin>,
    replies: Receiver<io::Result<String>>,
    reader: Option<JoinHandle<()>>,
}

impl Channel {
    fn send(&mut self, line: &str) -> Result<(), ChannelError> {
        let stdin = self.stdin.as_mut().ok_or(ChannelError::Disconnected)?;
        stdin.write_all(line.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;
        Ok(())
    }

    /// Drops replies left over from a round trip that timed out.
    fn drain_stale(&self) {
        while let Ok(stale) = self.replies.try_recv() {
            debug!("discarding stale reply: {stale:?}");
        }
    }

    /// Sends one request and waits for its reply line.
    fn round_trip(
        &mut self,
        command: &Command,
        rendered: &str,
        timeout: Option<Duration>,
    ) -> Result<String, ChannelError> {
        self.drain_stale();
        match command.payload() {
            Some(payload) => self.send(&format!("{rendered}\t{payload}"))?,
            None => self.send(rendered)?,
        }
        let reply = match timeout {
            Some(t) => self.replies.recv_timeout(t).map_err(|e| match e {
                RecvTimeoutError::Timeout => ChannelError::Timeout(t),
                RecvTimeoutError::Disconnected => ChannelError::Disconnected,
            })?,
            None => self.replies.recv().map_err(|_| ChannelError::Disconnected)?,
        }?;
        Ok(reply)
    }

    fn kill(&mut self) {
        self.stdin = None;
        {
            let mut child = self.instance.lock().unwrap_or_else(PoisonError::into_inner);
            registry::terminate(&mut child);
        }
        registry::release(self.pid);
        self.join_reader();
    }

    fn join_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("engine reply reader panicked");
            }
        }
    }
}

/// Solver session backed by a child process.
pub struct ProcessSession {
    config: SessionConfig,
    channel: Option<Channel>,
}

impl ProcessSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            channel: None,
        }
    }

    /// Pid of the running engine, if open.
    pub fn pid(&self) -> Option<u32> {
        self.channel.as_ref().map(|c| c.pid)
    }

    fn launch(&self) -> Result<Channel, SessionStartError> {
        let mut child = Process::new(&self.config.executable)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                SessionStartError::new(format!(
                    "cannot launch {}: {e}",
                    self.config.executable.display()
                ))
            })?;

        let pid = child.id();
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let instance = Arc::new(Mutex::new(child));
        registry::register(Arc::clone(&instance));

        let (stdin, stdout) = match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                abandon(&instance, pid);
                return Err(SessionStartError::new("engine standard streams unavailable"));
            }
        };

        let (tx, replies) = mpsc::channel();
        let reader = thread::Builder::new()
            .name(format!("engine-{pid}-reader"))
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let stop = line.is_err();
                    if tx.send(line).is_err() || stop {
                        break;
                    }
                }
            })
            .map_err(|e| {
                abandon(&instance, pid);
                SessionStartError::new(format!("cannot spawn reply reader: {e}"))
            })?;

        Ok(Channel {
            instance,
            pid,
            stdin: Some(stdin),
            replies,
            reader: Some(reader),
        })
    }

    fn handshake(&mut self) -> Result<(), ChannelError> {
        let model = self.config.model.display().to_string();
        info!("loading model {model}");
        self.execute(&Command::Open(model))?;
        self.execute(&Command::HideWindow(WindowKind::ErrorMessages))?;
        self.execute(&Command::HideWindow(WindowKind::WarningMessages))?;
        for raw in self.config.setup_commands.clone() {
            self.execute(&Command::Raw(raw))?;
        }
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.kill();
        }
    }
}

impl SolverSession for ProcessSession {
    fn open(&mut self) -> Result<(), SessionStartError> {
        self.teardown();
        if let Some(pid) = registry::evict() {
            warn!("an engine instance (pid {pid}) was already running; it has been terminated");
        }

        info!("launching engine {}", self.config.executable.display());
        let channel = self.launch()?;
        let pid = channel.pid;
        self.channel = Some(channel);
        thread::sleep(self.config.warmup);

        if let Err(e) = self.handshake() {
            self.teardown();
            return Err(SessionStartError::with_source(
                format!("engine (pid {pid}) did not accept the handshake"),
                e,
            ));
        }

        info!("engine ready (pid {pid})");
        Ok(())
    }

    fn execute(&mut self, command: &Command) -> Result<String, ChannelError> {
        let limit = self.config.max_command_len + COMMAND_OVERHEAD;
        let timeout = self.config.reply_timeout;
        let channel = self.channel.as_mut().ok_or(ChannelError::NotOpen)?;

        let rendered = command.render();
        if command.is_chunked() && rendered.len() > limit {
            return Err(ChannelError::CommandTooLong {
                len: rendered.len(),
                max: limit,
            });
        }

        match channel.round_trip(command, &rendered, timeout) {
            Ok(reply) => parse_reply(&reply),
            Err(e) => {
                // A late reply would be read as the answer to the next
                // request, so the channel is unusable until restarted.
                warn!("engine channel lost ({e}); session closed");
                self.teardown();
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        let Some(mut channel) = self.channel.take() else {
            thread::sleep(self.config.settle);
            return;
        };

        info!("closing engine (pid {})", channel.pid);
        let graceful = channel
            .send(&Command::Quit.render())
            .and_then(|_| {
                let quit = self.config.quit_timeout;
                let wait = self.config.reply_timeout.map_or(quit, |t| t.min(quit));
                channel
                    .replies
                    .recv_timeout(wait)
                    .map_err(|_| ChannelError::Disconnected)?
                    .map_err(ChannelError::from)
            })
            .and_then(|reply| parse_reply(&reply));

        if let Err(e) = graceful {
            warn!("graceful shutdown failed ({e}); terminating engine");
        }

        // Closing stdin lets a well-behaved engine exit on EOF; kill()
        // reaps it either way.
        channel.stdin = None;
        thread::sleep(self.config.settle);
        channel.kill();
    }

    fn restart(&mut self) -> Result<(), SessionStartError> {
        warn!("restarting engine");
        self.teardown();
        self.open()
    }

    fn is_open(&self) -> bool {
        self.channel.is_some()
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Terminates a half-launched engine and drops it from the registry.
fn abandon(instance: &InstanceHandle, pid: u32) {
    {
        let mut child = instance.lock().unwrap_or_else(PoisonError::into_inner);
        registry::terminate(&mut child);
    }
    registry::release(pid);
}

/// Parses one acknowledgment line.
fn parse_reply(line: &str) -> Result<String, ChannelError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line == "OK" {
        return Ok(String::new());
    }
    if let Some(data) = line.strip_prefix("OK\t") {
        return Ok(data.to_string());
    }
    if let Some(message) = line.strip_prefix("ERR\t") {
        return Err(ChannelError::Rejected(message.to_string()));
    }
    Err(ChannelError::MalformedAck(line.to_string()))
}
