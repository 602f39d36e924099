//! Interactive driver for a single debounced alarm.
//!
//! Reads observation commands from stdin, feeds them to one alarm running
//! on the tokio timer service, and prints every notification as a line of
//! JSON on stdout. Logs go to the journal under systemd and to stderr
//! otherwise, so stdout stays machine-readable.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use faultwatch::tracing::prelude::*;
use faultwatch::{
    AlarmConfig, AlarmStatus, DebouncedAlarm, FaultCode, LiveSettings, NotifyPolicy, Observation,
    QueueChannel, TokioTimerService,
};

const USAGE: &str = "\
Commands:
  ok                 Report the object as healthy
  fail [code]        Report a failure (default code -1)
  degraded           Report a slowdown
  suppressed         Report the object as intentionally offline
  force [code]       Report a failure, skipping the confirm delay
  label <name>       Set the object label for the next report
  timeout            Finish a pending confirmation now
  lock | unlock      Suppress or resume notifications
  delay <secs>       Change the confirm delay
  enable | disable   Toggle the notification gate
  status             Print the alarm state
  help               Show this text

Environment:
  FAULTWATCH_CONFIG       Path to a JSON alarm configuration
  FAULTWATCH_NOTIFY       Notify policy (none, failure_only, recovery_only,
                          auto_recovery, forced)
  FAULTWATCH_DELAY_SECS   Confirm delay in seconds (default: 0)
  RUST_LOG                Log filter (default: info)";

/// Build the alarm configuration, honoring FAULTWATCH_CONFIG and
/// FAULTWATCH_NOTIFY if set.
fn load_config() -> Result<AlarmConfig> {
    let mut config = match env::var("FAULTWATCH_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {path}"))?;
            AlarmConfig::from_json(&json)?
        }
        Err(_) => AlarmConfig::new("demo"),
    };

    if let Ok(policy) = env::var("FAULTWATCH_NOTIFY") {
        config.policy = policy
            .parse::<NotifyPolicy>()
            .with_context(|| format!("unknown notify policy {policy:?}"))?;
    }

    Ok(config)
}

fn initial_delay() -> Result<Duration> {
    match env::var("FAULTWATCH_DELAY_SECS") {
        Ok(secs) => {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("invalid FAULTWATCH_DELAY_SECS {secs:?}"))?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::ZERO),
    }
}

fn parse_code(arg: Option<&str>) -> Result<FaultCode> {
    match arg {
        Some(code) => Ok(FaultCode(code.parse().context("fault code must be an integer")?)),
        None => Ok(FaultCode(-1)),
    }
}

struct Session {
    alarm: DebouncedAlarm,
    delay_tx: watch::Sender<Duration>,
    enabled_tx: watch::Sender<bool>,
    /// Label carried by the next status report.
    label: Option<String>,
}

impl Session {
    fn new(alarm: DebouncedAlarm, delay: Duration) -> Self {
        let (delay_tx, delay_rx) = watch::channel(delay);
        let (enabled_tx, enabled_rx) = watch::channel(true);
        alarm.attach_settings(LiveSettings {
            confirm_delay: Some(delay_rx),
            enabled: Some(enabled_rx),
        });

        Self {
            alarm,
            delay_tx,
            enabled_tx,
            label: None,
        }
    }

    fn report(&mut self, observation: Observation) {
        let observation = match self.label.take() {
            Some(label) => observation.label(label),
            None => observation,
        };
        self.alarm.observe(observation);
    }

    fn handle(&mut self, line: &str) -> Result<()> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(());
        };
        let arg = words.next();

        match command {
            "ok" => self.report(Observation::new(AlarmStatus::Ok)),
            "fail" => self.report(Observation::new(AlarmStatus::Failure(parse_code(arg)?))),
            "degraded" => self.report(Observation::new(AlarmStatus::Degraded)),
            "suppressed" => self.report(Observation::new(AlarmStatus::Suppressed)),
            "force" => {
                let code = parse_code(arg)?;
                self.report(Observation::new(AlarmStatus::Failure(code)).forced());
            }
            "label" => {
                let Some(label) = arg else {
                    bail!("label requires a name");
                };
                self.label = Some(label.to_string());
            }
            "timeout" => self.alarm.forced_timeout(),
            "lock" => self.alarm.lock(),
            "unlock" => self.alarm.unlock(),
            "delay" => {
                let secs: u64 = arg
                    .context("delay requires seconds")?
                    .parse()
                    .context("delay must be a whole number of seconds")?;
                self.delay_tx.send_replace(Duration::from_secs(secs));
            }
            "enable" => {
                self.enabled_tx.send_replace(true);
            }
            "disable" => {
                self.enabled_tx.send_replace(false);
            }
            "status" => println!("{}", serde_json::to_string(&self.alarm.snapshot())?),
            "help" => eprintln!("{USAGE}"),
            _ => bail!("unknown command {command:?}, try `help`"),
        }

        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    faultwatch::tracing::init_journald_or_stderr();

    let config = load_config()?;
    let delay = initial_delay()?;

    let (channel, mut notifications) = QueueChannel::bounded(64);
    let timers = TokioTimerService::current()?;
    let alarm = DebouncedAlarm::new(config, Arc::new(channel), &timers)?;

    let printer = tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            match serde_json::to_string(&notification) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("Failed to encode notification: {e}"),
            }
        }
    });

    let mut session = Session::new(alarm, delay);

    info!("Reading commands from stdin; `help` lists them");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Err(e) = session.handle(line.trim()) {
            eprintln!("error: {e:#}");
        }
    }

    // Dropping the alarm stops its timer and closes the queue.
    drop(session);
    printer.await?;

    Ok(())
}
