//! Target bootstrap: launch a JVM under JDWP or attach to a listening one.
//!
//! On launch the debugger listens and the JVM connects back
//! (`server=n,suspend=y`), so the target stays suspended until the
//! session's first resume.

use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use jvdb_wire::JdwpConnection;

use crate::error::{Error, Result};
use crate::jdwp::JdwpTarget;

const ACCEPT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub java: PathBuf,
    pub main_class: String,
    pub classpath: Option<String>,
    pub app_args: Vec<String>,
    pub vm_opts: Vec<String>,
    pub timeout: Duration,
}

impl LaunchOptions {
    /// Arguments passed to `java`, for a debugger listening on `port`.
    #[must_use]
    pub fn java_args(&self, port: u16) -> Vec<String> {
        let mut args = self.vm_opts.clone();
        args.push(format!(
            "-agentlib:jdwp=transport=dt_socket,server=n,suspend=y,address=127.0.0.1:{port}"
        ));
        if let Some(classpath) = &self.classpath {
            args.push("-classpath".to_string());
            args.push(classpath.clone());
        }
        args.push(self.main_class.clone());
        args.extend(self.app_args.iter().cloned());
        args
    }
}

/// A launched JVM, killed when dropped.
#[derive(Debug)]
pub struct LaunchedVm {
    child: Child,
}

impl Drop for LaunchedVm {
    fn drop(&mut self) {
        if let Ok(Some(status)) = self.child.try_wait() {
            debug!(%status, "target process already exited");
            return;
        }
        if let Err(err) = self.child.kill() {
            debug!("kill target process: {err}");
        }
        if let Err(err) = self.child.wait() {
            debug!("reap target process: {err}");
        }
    }
}

fn unavailable(context: impl std::fmt::Display) -> impl FnOnce(std::io::Error) -> Error {
    move |err| Error::TargetUnavailable(format!("{context}: {err}"))
}

/// Launch `java` and wait for it to connect back.
pub fn launch(options: &LaunchOptions) -> Result<JdwpTarget> {
    let listener =
        TcpListener::bind(("127.0.0.1", 0)).map_err(unavailable("bind debugger socket"))?;
    listener
        .set_nonblocking(true)
        .map_err(unavailable("configure debugger socket"))?;
    let port = listener
        .local_addr()
        .map_err(unavailable("debugger socket address"))?
        .port();

    let args = options.java_args(port);
    debug!(java = %options.java.display(), ?args, "spawning target");
    let child = Command::new(&options.java)
        .args(&args)
        .stdin(Stdio::null())
        .spawn()
        .map_err(unavailable(format!("cannot start {}", options.java.display())))?;
    let mut process = LaunchedVm { child };

    let stream = accept_target(&listener, &mut process, options.timeout)?;
    stream
        .set_nonblocking(false)
        .map_err(unavailable("configure target connection"))?;
    let conn = JdwpConnection::from_stream(stream)
        .map_err(|err| Error::TargetUnavailable(format!("JDWP handshake: {err}")))?;
    info!(port, main = %options.main_class, "target launched");
    Ok(JdwpTarget::new(conn).with_process(process))
}

fn accept_target(
    listener: &TcpListener,
    process: &mut LaunchedVm,
    timeout: Duration,
) -> Result<TcpStream> {
    let deadline = Instant::now() + timeout;
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "target connected");
                return Ok(stream);
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(err) => return Err(unavailable("accept target connection")(err)),
        }
        if let Some(status) = process
            .child
            .try_wait()
            .map_err(unavailable("poll target process"))?
        {
            return Err(Error::TargetUnavailable(format!(
                "target exited before connecting ({status})"
            )));
        }
        if Instant::now() >= deadline {
            return Err(Error::TargetUnavailable(format!(
                "target did not connect within {}ms",
                timeout.as_millis()
            )));
        }
        thread::sleep(ACCEPT_POLL);
    }
}

/// Attach to a JVM listening on `address` (`host:port`).
pub fn attach(address: &str, timeout: Duration) -> Result<JdwpTarget> {
    let addr = address
        .to_socket_addrs()
        .map_err(unavailable(format!("resolve {address}")))?
        .next()
        .ok_or_else(|| Error::TargetUnavailable(format!("no address for {address}")))?;
    let conn = JdwpConnection::connect(addr, timeout)
        .map_err(|err| Error::TargetUnavailable(format!("attach to {address}: {err}")))?;
    info!(%addr, "attached to target");
    Ok(JdwpTarget::new(conn))
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;

    #[test]
    fn launch_arguments_put_agent_before_main_class() {
        let options = LaunchOptions {
            java: PathBuf::from("java"),
            main_class: "ExampleApp".into(),
            classpath: Some("demos".into()),
            app_args: vec!["3".into()],
            vm_opts: vec!["-Xmx64m".into()],
            timeout: Duration::from_secs(1),
        };
        expect![[r#"
-Xmx64m -agentlib:jdwp=transport=dt_socket,server=n,suspend=y,address=127.0.0.1:5005 -classpath demos ExampleApp 3"#]]
        .assert_eq(&options.java_args(5005).join(" "));
    }

    #[test]
    fn attach_to_closed_port_is_unavailable() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let address = listener.local_addr().expect("addr").to_string();
        drop(listener);
        let err = attach(&address, Duration::from_millis(200))
            .err()
            .expect("attach should fail");
        assert!(matches!(err, Error::TargetUnavailable(_)), "{err}");
    }
}
