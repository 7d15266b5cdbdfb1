use std::io::Write;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use lwes_config::{EmitterConfig, ListenerConfig, LwesConfig};
use lwes_engine::{wait_for_interrupt, Emitter, Listener};
use lwes_protocols::Event;
use lwes_telemetry::MetricsRecorder;

#[derive(Parser)]
#[command(name = "lwes", version, about = "Emit and listen for LWES events")]
pub struct Cli {
    /// Configuration file, layered over defaults and under LWES_* variables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emit JSON events read from stdin, one object per line
    Emit(EmitArgs),
    /// Print events as they arrive
    Listen(ListenArgs),
}

impl Commands {
    /// Bottom configuration layer; `emit` runs without heartbeats unless configured.
    pub fn defaults(&self) -> LwesConfig {
        let mut defaults = LwesConfig::default();
        if let Commands::Emit(_) = self {
            defaults.emitter.heartbeat_secs = 0;
        }
        defaults
    }
}

#[derive(Args, Debug, Clone)]
pub struct EmitArgs {
    /// Destination, e.g. 224.2.2.22:12345 or unixgram:///tmp/lwes.sock
    #[arg(short, long)]
    pub address: Option<String>,
    /// Multicast interface address or index
    #[arg(short, long)]
    pub interface: Option<String>,
    /// Seconds between heartbeats, 0 disables them; 0 unless configured
    #[arg(long)]
    pub heartbeat: Option<u64>,
    /// Multicast hop limit
    #[arg(long)]
    pub ttl: Option<u32>,
}

impl EmitArgs {
    pub fn apply(&self, config: &mut EmitterConfig) {
        if let Some(address) = &self.address {
            config.address = address.clone();
        }
        if self.interface.is_some() {
            config.interface = self.interface.clone();
        }
        if let Some(ttl) = self.ttl {
            config.ttl = ttl;
        }
        if let Some(heartbeat) = self.heartbeat {
            config.heartbeat_secs = heartbeat;
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// Address to bind or multicast group to join
    #[arg(short, long)]
    pub address: Option<String>,
    /// Multicast interface address or index
    #[arg(short, long)]
    pub interface: Option<String>,
    /// Print events as JSON
    #[arg(long)]
    pub json: bool,
    /// One attribute per line; indented with --json
    #[arg(long)]
    pub pretty: bool,
}

impl ListenArgs {
    pub fn apply(&self, config: &mut ListenerConfig) {
        if let Some(address) = &self.address {
            config.address = address.clone();
        }
        if self.interface.is_some() {
            config.interface = self.interface.clone();
        }
    }

    pub fn format(&self) -> OutputFormat {
        match (self.json, self.pretty) {
            (true, true) => OutputFormat::IndentedJson,
            (true, false) => OutputFormat::Json,
            (false, true) => OutputFormat::Pretty,
            (false, false) => OutputFormat::Display,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Display,
    Json,
    IndentedJson,
    Pretty,
}

impl OutputFormat {
    pub fn render(self, event: &Event) -> anyhow::Result<String> {
        Ok(match self {
            OutputFormat::Display => event.to_string(),
            OutputFormat::Json => event.to_json()?,
            OutputFormat::IndentedJson => event.to_json_pretty()?,
            OutputFormat::Pretty => {
                let mut text = format!("{}\n", event.name);
                for (key, value) in event.iter() {
                    text.push_str(&format!("{key}: {value}\n"));
                }
                text
            }
        })
    }
}

pub async fn run_command(
    cli: Cli,
    mut config: LwesConfig,
    metrics: MetricsRecorder,
) -> anyhow::Result<()> {
    match cli.command {
        Commands::Emit(args) => {
            args.apply(&mut config.emitter);
            config.emitter.validate_or_err()?;
            run_emit(&config.emitter, metrics).await
        }
        Commands::Listen(args) => {
            args.apply(&mut config.listener);
            config.listener.validate_or_err()?;
            run_listen(&config.listener, args.format(), metrics).await
        }
    }
}

/// Re-checks a section after command-line overrides.
trait ValidateOrErr {
    fn validate_or_err(&self) -> anyhow::Result<()>;
}

impl<T: lwes_config::Validate> ValidateOrErr for T {
    fn validate_or_err(&self) -> anyhow::Result<()> {
        self.validate()
            .map_err(lwes_config::ConfigError::from)
            .context("invalid command-line override")
    }
}

async fn run_emit(config: &EmitterConfig, metrics: MetricsRecorder) -> anyhow::Result<()> {
    let emitter = Emitter::start(config, Some(metrics))
        .await
        .with_context(|| format!("cannot emit to {}", config.address))?;

    let sent = emit_lines(&emitter).await;
    emitter.close().await?;
    let count = sent?;
    info!(count, "stdin exhausted");
    Ok(())
}

async fn emit_lines(emitter: &Emitter) -> anyhow::Result<usize> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut count = 0;
    let mut line_no = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let event =
            Event::from_json(&line).with_context(|| format!("invalid event on line {line_no}"))?;
        emitter.emit(&event).await?;
        count += 1;
    }
    Ok(count)
}

async fn run_listen(
    config: &ListenerConfig,
    format: OutputFormat,
    metrics: MetricsRecorder,
) -> anyhow::Result<()> {
    let listener = Arc::new(
        Listener::from_config(config, Some(metrics))
            .await
            .with_context(|| format!("cannot listen on {}", config.address))?,
    );
    let closer = {
        let listener = listener.clone();
        tokio::spawn(async move {
            match wait_for_interrupt().await {
                Ok(()) => {
                    debug!("interrupt received, closing listener");
                    if let Err(e) = listener.close() {
                        warn!(error = %e, "listener close failed");
                    }
                }
                Err(e) => warn!(error = %e, "cannot watch for interrupts"),
            }
        })
    };

    let stdout = std::io::stdout();
    let outcome = listener
        .for_each(|result| match result {
            Ok(event) => {
                let printed = format
                    .render(&event)
                    .and_then(|text| {
                        let mut out = stdout.lock();
                        writeln!(out, "{text}")?;
                        out.flush()?;
                        Ok(())
                    });
                match printed {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(e) => ControlFlow::Break(Err(e)),
                }
            }
            Err(e) if e.is_closed() => ControlFlow::Break(Ok(())),
            Err(e) => {
                warn!(error = %e, "receive failed");
                ControlFlow::Continue(())
            }
        })
        .await;

    closer.abort();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwes_protocols::Value;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn emit_overrides_replace_config_values() {
        let cli = parse(&["lwes", "emit", "-a", "127.0.0.1:9191", "--ttl", "4"]);
        let Commands::Emit(args) = cli.command else {
            panic!("expected emit");
        };
        let mut config = EmitterConfig::default();
        args.apply(&mut config);

        assert_eq!(config.address, "127.0.0.1:9191");
        assert_eq!(config.ttl, 4);
        assert_eq!(config.heartbeat_secs, 1);
        assert_eq!(config.interface, None);
    }

    #[test]
    fn emit_heartbeat_defaults_to_zero_unless_configured() {
        let cli = parse(&["lwes", "emit"]);
        let mut config = cli.command.defaults();
        assert_eq!(config.emitter.heartbeat_secs, 0);

        config.emitter.heartbeat_secs = 5;
        let Commands::Emit(args) = &cli.command else {
            panic!("expected emit");
        };
        args.apply(&mut config.emitter);
        assert_eq!(config.emitter.heartbeat_secs, 5);

        let cli = parse(&["lwes", "emit", "--heartbeat", "2"]);
        let Commands::Emit(args) = &cli.command else {
            panic!("expected emit");
        };
        args.apply(&mut config.emitter);
        assert_eq!(config.emitter.heartbeat_secs, 2);

        let listen = parse(&["lwes", "listen"]);
        assert_eq!(listen.command.defaults().emitter.heartbeat_secs, 1);
    }

    #[test]
    fn config_flag_is_global() {
        let cli = parse(&["lwes", "listen", "--config", "custom.yaml", "--json"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
    }

    #[test]
    fn flags_select_output_format() {
        let format = |flags: &[&str]| {
            let mut argv = vec!["lwes", "listen"];
            argv.extend_from_slice(flags);
            match parse(&argv).command {
                Commands::Listen(args) => args.format(),
                Commands::Emit(_) => panic!("expected listen"),
            }
        };
        assert_eq!(format(&[]), OutputFormat::Display);
        assert_eq!(format(&["--json"]), OutputFormat::Json);
        assert_eq!(format(&["--pretty"]), OutputFormat::Pretty);
        assert_eq!(format(&["--json", "--pretty"]), OutputFormat::IndentedJson);
    }

    #[test]
    fn pretty_lists_one_attribute_per_line() {
        let event = Event::new("Test::Pretty")
            .with("a", 1u16)
            .with("b", Value::String("two".into()));
        let text = OutputFormat::Pretty.render(&event).unwrap();
        assert_eq!(text, "Test::Pretty\na: 1\nb: two\n");
    }

    #[test]
    fn invalid_override_is_reported() {
        let cli = parse(&["lwes", "listen", "-a", "tcp://host:1"]);
        let Commands::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        let mut config = ListenerConfig::default();
        args.apply(&mut config);
        assert!(config.validate_or_err().is_err());
    }
}
