use std::rc::Rc;
use std::time::Duration;

use chrono::Utc;
use clap::{Args, Subcommand, ValueEnum};
use studytrack_core::storage::{Config, Database, TimerStore, Tool};
use studytrack_core::timer::{
    NotificationSink, Phase, PhaseKind, PhaseStateMachine, TimerEngine, TimerListener, TimerStatus,
};
use studytrack_core::{drive, Event, SystemClock, Tickable};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ToolArg {
    Pomodoro,
    DeepFocus,
    EyeRest,
    Meditation,
}

impl From<ToolArg> for Tool {
    fn from(arg: ToolArg) -> Self {
        match arg {
            ToolArg::Pomodoro => Tool::Pomodoro,
            ToolArg::DeepFocus => Tool::DeepFocus,
            ToolArg::EyeRest => Tool::EyeRest,
            ToolArg::Meditation => Tool::Meditation,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PhaseArg {
    Work,
    ShortBreak,
    LongBreak,
}

impl From<PhaseArg> for PhaseKind {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Work => PhaseKind::Work,
            PhaseArg::ShortBreak => PhaseKind::ShortBreak,
            PhaseArg::LongBreak => PhaseKind::LongBreak,
        }
    }
}

#[derive(Args, Debug)]
pub struct ToolOpt {
    /// Which timer to operate on
    #[arg(long, value_enum, default_value_t = ToolArg::Pomodoro)]
    tool: ToolArg,
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the current phase's countdown
    Start {
        #[command(flatten)]
        tool: ToolOpt,
        /// Countdown length in seconds (meditation only)
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Pause the running countdown
    Pause {
        #[command(flatten)]
        tool: ToolOpt,
    },
    /// Resume a paused countdown
    Resume {
        #[command(flatten)]
        tool: ToolOpt,
    },
    /// Reset the countdown to idle
    Reset {
        #[command(flatten)]
        tool: ToolOpt,
        /// Also return to the first work phase and clear the session count
        #[arg(long)]
        cycle: bool,
    },
    /// Abandon the current phase and start another
    Skip {
        #[command(flatten)]
        tool: ToolOpt,
        /// Target phase (defaults to the natural next phase)
        #[arg(long, value_enum)]
        to: Option<PhaseArg>,
        /// Count a skipped work phase as a completed session
        #[arg(long)]
        count: bool,
    },
    /// Print current timer state as JSON
    Status {
        #[command(flatten)]
        tool: ToolOpt,
    },
    /// Tick the timer in the foreground until it stops
    Watch {
        #[command(flatten)]
        tool: ToolOpt,
        /// Stop after this many completed phases
        #[arg(long)]
        cycles: Option<usize>,
    },
}

impl TimerAction {
    fn tool(&self) -> Tool {
        let opt = match self {
            TimerAction::Start { tool, .. }
            | TimerAction::Pause { tool }
            | TimerAction::Resume { tool }
            | TimerAction::Reset { tool, .. }
            | TimerAction::Skip { tool, .. }
            | TimerAction::Status { tool }
            | TimerAction::Watch { tool, .. } => tool,
        };
        opt.tool.into()
    }
}

/// Prints the countdown on stderr while watching.
struct ProgressPrinter {
    label: &'static str,
    enabled: bool,
}

impl TimerListener for ProgressPrinter {
    fn on_tick(&mut self, remaining_ms: u64) {
        if self.enabled {
            eprint!("\r{} {}  ", self.label, format_secs(remaining_ms.div_ceil(1000)));
        }
    }

    fn on_complete(&mut self) {
        if self.enabled {
            eprintln!();
        }
    }
}

/// Announces finished phases and records them for statistics.
struct CliSink {
    db: Rc<Database>,
    tool: Tool,
    notify: bool,
}

impl NotificationSink for CliSink {
    fn on_phase_complete(&mut self, completed: &Phase, next: &Phase) {
        if self.notify {
            eprintln!(
                "{} finished. Next: {} ({})",
                completed.kind.label(),
                next.kind.label(),
                format_secs(next.duration_secs)
            );
        }
        record(&self.db, self.tool, completed.kind.as_str(), completed.duration_secs);
    }
}

enum Timer {
    Cycle(PhaseStateMachine<SystemClock>),
    Single(TimerEngine<SystemClock>),
}

/// One tool's timer, backed by the database.
struct Session {
    tool: Tool,
    timer: Timer,
    db: Rc<Database>,
    notify: bool,
    default_secs: u64,
}

impl Session {
    fn open(tool: Tool, config: &Config, db: Rc<Database>, watch: bool) -> Self {
        let store = TimerStore::new(db.clone(), tool.storage_key());
        let listener = ProgressPrinter {
            label: tool.name(),
            enabled: watch,
        };
        let notify = config.notifications.enabled;
        let (timer, default_secs) = match config.tool(tool) {
            Some(cfg) => {
                let machine = PhaseStateMachine::new(
                    SystemClock,
                    cfg.durations(),
                    cfg.long_break_interval,
                    cfg.options(),
                )
                .with_store(store)
                .with_listener(listener)
                .with_sink(CliSink {
                    db: db.clone(),
                    tool,
                    notify,
                });
                (Timer::Cycle(machine), cfg.work_secs)
            }
            None => {
                let secs = config.tools.meditation.duration_secs;
                let engine = TimerEngine::new(SystemClock, secs)
                    .with_store(store)
                    .with_listener(listener);
                (Timer::Single(engine), secs)
            }
        };
        Self {
            tool,
            timer,
            db,
            notify,
            default_secs,
        }
    }

    fn restore(&mut self) -> Option<Event> {
        match &mut self.timer {
            Timer::Cycle(machine) => machine.restore(),
            Timer::Single(engine) => engine.restore(),
        }
    }

    fn status(&self) -> TimerStatus {
        match &self.timer {
            Timer::Cycle(machine) => machine.engine().status(),
            Timer::Single(engine) => engine.status(),
        }
    }

    fn start(&mut self, secs: Option<u64>) -> Result<Event, Box<dyn std::error::Error>> {
        match &mut self.timer {
            Timer::Cycle(machine) => {
                if secs.is_some() {
                    return Err("--secs only applies to meditation".into());
                }
                Ok(machine.start()?)
            }
            Timer::Single(engine) => Ok(engine.start(secs.unwrap_or(self.default_secs))?),
        }
    }

    fn pause(&mut self) -> Option<Event> {
        let event = match &mut self.timer {
            Timer::Cycle(machine) => machine.pause(),
            Timer::Single(engine) => engine.pause(),
        };
        self.observe(event)
    }

    fn resume(&mut self) -> Option<Event> {
        match &mut self.timer {
            Timer::Cycle(machine) => machine.resume(),
            Timer::Single(engine) => engine.resume(),
        }
    }

    fn reset(&mut self, cycle: bool) -> Event {
        match &mut self.timer {
            Timer::Cycle(machine) if cycle => machine.reset_cycle(),
            Timer::Cycle(machine) => machine.reset(),
            Timer::Single(engine) => engine.reset(),
        }
    }

    fn skip(
        &mut self,
        to: Option<PhaseKind>,
        count: bool,
    ) -> Result<Event, Box<dyn std::error::Error>> {
        match &mut self.timer {
            Timer::Cycle(machine) => Ok(match to {
                Some(target) => machine.skip_to(target, count),
                None => machine.skip(count),
            }),
            Timer::Single(_) => Err(format!("{} has no phases to skip", self.tool.name()).into()),
        }
    }

    fn snapshot(&self) -> Event {
        match &self.timer {
            Timer::Cycle(machine) => machine.snapshot(),
            Timer::Single(engine) => engine.snapshot(),
        }
    }

    fn flush(&self) {
        match &self.timer {
            Timer::Cycle(machine) => machine.flush(),
            Timer::Single(engine) => engine.flush(),
        }
    }

    /// Single countdowns have no sink; announce and record them here.
    fn observe(&self, event: Option<Event>) -> Option<Event> {
        if let (Timer::Single(_), Some(Event::TimerCompleted { total_ms, .. })) =
            (&self.timer, &event)
        {
            if self.notify {
                eprintln!("{} finished.", self.tool.name());
            }
            record(&self.db, self.tool, self.tool.name(), total_ms / 1000);
        }
        event
    }
}

impl Tickable for Session {
    fn tick(&mut self) -> Option<Event> {
        let event = match &mut self.timer {
            Timer::Cycle(machine) => machine.tick(),
            Timer::Single(engine) => engine.tick(),
        };
        self.observe(event)
    }

    fn is_ticking(&self) -> bool {
        self.status() == TimerStatus::Running
    }
}

fn record(db: &Database, tool: Tool, phase: &str, duration_secs: u64) {
    if let Err(err) = db.record_session(tool.name(), phase, duration_secs, Utc::now()) {
        tracing::warn!(error = %err, "failed to record session");
    }
}

fn format_secs(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn print_event(event: &Event) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Rc::new(Database::open()?);
    let watch = matches!(action, TimerAction::Watch { .. });
    let mut session = Session::open(action.tool(), &config, db, watch);
    if let Some(event) = session.restore() {
        tracing::debug!(?event, "restored timer");
    }

    let result = dispatch(&mut session, action, &config);
    session.flush();
    result
}

fn dispatch(
    session: &mut Session,
    action: TimerAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Start { secs, .. } => {
            let event = session.start(secs)?;
            print_event(&event)?;
        }
        TimerAction::Pause { .. } => match session.pause() {
            Some(event) => print_event(&event)?,
            None => print_event(&session.snapshot())?,
        },
        TimerAction::Resume { .. } => match session.resume() {
            Some(event) => print_event(&event)?,
            None => print_event(&session.snapshot())?,
        },
        TimerAction::Reset { cycle, .. } => {
            let event = session.reset(cycle);
            print_event(&event)?;
        }
        TimerAction::Skip { to, count, .. } => {
            let event = session.skip(to.map(Into::into), count)?;
            print_event(&event)?;
        }
        TimerAction::Status { .. } => {
            if let Some(event) = session.tick() {
                print_event(&event)?;
            }
            print_event(&session.snapshot())?;
        }
        TimerAction::Watch { cycles, .. } => {
            match session.status() {
                TimerStatus::Idle | TimerStatus::Completed => print_event(&session.start(None)?)?,
                TimerStatus::Paused => {
                    if let Some(event) = session.resume() {
                        print_event(&event)?;
                    }
                }
                TimerStatus::Running => {}
            }

            let period = Duration::from_millis(config.ticker.interval_ms.max(1));
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async {
                tokio::select! {
                    completed = drive(&mut *session, period, cycles, |event| {
                        if let Err(err) = print_event(event) {
                            tracing::warn!(error = %err, "failed to print event");
                        }
                    }) => {
                        tracing::debug!(completed, "watch finished");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        eprintln!();
                        tracing::info!("interrupted; saving timer state");
                    }
                }
            });
        }
    }
    Ok(())
}
