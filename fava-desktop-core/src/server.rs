use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::window::DocumentServer;

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launch parameters for the Fava child process.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub command: String,
    /// Arguments with `{host}`, `{port}` and `{file}` placeholders.
    pub args: Vec<String>,
    pub host: String,
    pub startup_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            command: "fava".to_string(),
            args: ["--host", "{host}", "--port", "{port}", "{file}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            host: "127.0.0.1".to_string(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEventKind {
    /// The server accepts connections at `url`.
    Started { url: String },
    /// The server never became ready.
    Failed { message: String },
    /// A previously started server went away.
    Exited { message: String },
}

/// Notification from a server instance, tagged with the start it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    pub generation: u64,
    pub kind: ServerEventKind,
}

/// Supervises one Fava child process at a time on a private tokio runtime.
///
/// Events are delivered through the receiver returned by [`FavaServer::new`].
/// Every `start` and `stop` advances the generation, so consumers can drop
/// events from instances that were already replaced.
pub struct FavaServer {
    runtime: tokio::runtime::Runtime,
    config: ServerConfig,
    events: mpsc::UnboundedSender<ServerEvent>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    url: Arc<Mutex<Option<(u64, String)>>>,
}

impl FavaServer {
    pub fn new(
        config: ServerConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("fava-server")
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime for Fava server: {}", e))?;
        let (events, receiver) = mpsc::unbounded_channel();
        let server = FavaServer {
            runtime,
            config,
            events,
            generation: 0,
            task: None,
            url: Arc::new(Mutex::new(None)),
        };
        Ok((server, receiver))
    }

    /// Base URL of the current instance once it has started.
    pub fn url(&self) -> Option<String> {
        match &*self.url.lock() {
            Some((generation, url)) if *generation == self.generation => Some(url.clone()),
            _ => None,
        }
    }
}

impl DocumentServer for FavaServer {
    fn start(&mut self, path: &Path) {
        // The previous instance is killed, not asked to shut down.
        self.stop();
        let generation = self.generation;
        log::info!(
            "Fava server [{}]: serving {}",
            generation,
            path.display()
        );
        let task = self.runtime.spawn(run_server(
            self.config.clone(),
            path.to_path_buf(),
            generation,
            self.events.clone(),
            self.url.clone(),
        ));
        self.task = Some(task);
    }

    /// Aborts the instance task and waits for it to unwind, so the child has
    /// been sent a kill before this returns.
    fn stop(&mut self) {
        self.generation += 1;
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                log::info!("Fava server [{}]: stopping", self.generation - 1);
            }
            // Dropping the task drops the child, which is spawned with kill_on_drop.
            task.abort();
            if let Err(e) = self.runtime.block_on(task) {
                if !e.is_cancelled() {
                    log::warn!("Fava server task failed: {}", e);
                }
            }
        }
        *self.url.lock() = None;
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for FavaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn emit(events: &mpsc::UnboundedSender<ServerEvent>, generation: u64, kind: ServerEventKind) {
    if events.send(ServerEvent { generation, kind }).is_err() {
        log::debug!("Fava server [{}]: event receiver dropped", generation);
    }
}

async fn run_server(
    config: ServerConfig,
    file: PathBuf,
    generation: u64,
    events: mpsc::UnboundedSender<ServerEvent>,
    url_slot: Arc<Mutex<Option<(u64, String)>>>,
) {
    let port = match pick_free_port(&config.host) {
        Ok(port) => port,
        Err(message) => {
            emit(&events, generation, ServerEventKind::Failed { message });
            return;
        }
    };
    let args = expand_args(&config.args, &config.host, port, &file);
    log::info!(
        "Fava server [{}]: starting '{}' with args {:?}",
        generation,
        config.command,
        args
    );

    let mut child = match TokioCommand::new(&config.command)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            let message = format!("Failed to start '{}': {}", config.command, e);
            log::error!("Fava server [{}]: {}", generation, message);
            emit(&events, generation, ServerEventKind::Failed { message });
            return;
        }
    };

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            log::info!("Fava stderr [{}]: {}", generation, trimmed);
                        }
                    }
                    Err(_) => break,
                }
            }
        });
    }

    let ready = tokio::select! {
        status = child.wait() => Err(match status {
            Ok(status) => format!("Fava exited before it was ready ({})", status),
            Err(e) => format!("Failed to wait for Fava: {}", e),
        }),
        result = wait_until_listening(
            &config.host,
            port,
            config.startup_timeout,
            config.poll_interval,
        ) => result,
    };
    if let Err(message) = ready {
        log::error!("Fava server [{}]: {}", generation, message);
        emit(&events, generation, ServerEventKind::Failed { message });
        return;
    }

    let url = format!("http://{}/", authority(&config.host, port));
    *url_slot.lock() = Some((generation, url.clone()));
    log::info!("Fava server [{}]: ready at {}", generation, url);
    emit(&events, generation, ServerEventKind::Started { url });

    let message = match child.wait().await {
        Ok(status) => format!("Fava exited ({})", status),
        Err(e) => format!("Failed to wait for Fava: {}", e),
    };
    log::warn!("Fava server [{}]: {}", generation, message);
    emit(&events, generation, ServerEventKind::Exited { message });
}

/// Ask the OS for an unused TCP port on `host`.
pub fn pick_free_port(host: &str) -> Result<u16, String> {
    std::net::TcpListener::bind((host, 0))
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .map_err(|e| format!("Failed to find a free port on {}: {}", host, e))
}

/// Substitute `{host}`, `{port}` and `{file}` in every argument.
pub fn expand_args(args: &[String], host: &str, port: u16, file: &Path) -> Vec<String> {
    let port = port.to_string();
    let file = file.to_string_lossy();
    args.iter()
        .map(|arg| {
            arg.replace("{host}", host)
                .replace("{port}", &port)
                .replace("{file}", &file)
        })
        .collect()
}

fn authority(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Poll `host:port` until it accepts a TCP connection or `timeout` elapses.
pub async fn wait_until_listening(
    host: &str,
    port: u16,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), String> {
    let poll = async {
        loop {
            if TcpStream::connect((host, port)).await.is_ok() {
                return;
            }
            tokio::time::sleep(poll_interval).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.map_err(|_| {
        format!(
            "Fava did not accept connections on port {} within {:.1}s",
            port,
            timeout.as_secs_f32()
        )
    })
}
