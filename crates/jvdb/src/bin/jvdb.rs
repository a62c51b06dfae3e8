//! CLI entrypoint for jvdb.

#[path = "jvdb/cli.rs"]
mod cli;
#[path = "jvdb/style.rs"]
mod style;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use jvdb::{
    CommandConsole, DebugConfig, DebugSession, EventLog, JdwpTarget, LaunchOptions, Printer,
};

use cli::Cli;

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", style::error(format!("Error: {err:#}")));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.bp {
        Some(path) => DebugConfig::load(path)
            .with_context(|| format!("failed to load breakpoint config {}", path.display()))?,
        None => DebugConfig::default(),
    };
    let mut printer = Printer::stdout();
    if let Some(path) = &cli.log {
        let log = EventLog::open(path)
            .with_context(|| format!("failed to open event log {}", path.display()))?;
        printer = printer.with_log(log);
    }
    let mut console = match &cli.script {
        Some(path) => CommandConsole::from_script(path)
            .with_context(|| format!("failed to open script {}", path.display()))?,
        None => CommandConsole::stdin(),
    };

    let target = connect(&cli, &mut printer)?;
    let mut session = DebugSession::new(Box::new(target), printer);
    session.apply_config(&config);
    if let Some(policy) = cli.exception {
        session.set_exception_policy(policy);
    }
    if let Some(trace) = cli.trace {
        session.set_tracing(trace.is_on());
    }
    info!(
        policy = %session.exception_policy(),
        breakpoints = session.registry().pending().len(),
        "session ready"
    );
    session.run(&mut console)?;
    Ok(())
}

fn connect(cli: &Cli, printer: &mut Printer) -> anyhow::Result<JdwpTarget> {
    if let Some(main_class) = &cli.launch {
        if cli.cp.is_none() {
            eprintln!(
                "{}",
                style::warning("warning: no --cp or CLASSPATH; using the JVM default classpath")
            );
        }
        printer.record("VMStartRequested", &[("main", main_class.as_str())]);
        let options = LaunchOptions {
            java: cli.java.clone(),
            main_class: main_class.clone(),
            classpath: cli.cp.clone(),
            app_args: cli.app_args(),
            vm_opts: cli.vm_opts(),
            timeout: cli.connect_timeout(),
        };
        return jvdb::launch(&options).with_context(|| format!("failed to launch {main_class}"));
    }
    let address = cli
        .attach
        .as_deref()
        .context("one of --launch or --attach is required")?;
    let target = jvdb::attach(address, cli.connect_timeout())
        .with_context(|| format!("failed to attach to {address}"))?;
    let (host, port) = address.rsplit_once(':').unwrap_or((address, ""));
    printer.record("VMAttached", &[("host", host), ("port", port)]);
    Ok(target)
}
