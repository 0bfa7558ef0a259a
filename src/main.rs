mod clock;
mod config;
mod plan;
mod reminder;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDateTime, TimeZone};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::clock::{Clock, FixedClock, SystemClock};
use crate::config::{ReminderSettings, load_settings, save_settings};
use crate::plan::line::{
    TimeOfDay, count_timed_lines, parse_time, split_plan_line, theme_from_line,
};
use crate::plan::weekly::{DAYS_PER_PLAN, load_weekly_plan};
use crate::reminder::platform::{NotificationId, PermissionStatus};
use crate::reminder::queue::DeviceQueue;
use crate::reminder::scheduler::PlanReminders;
use crate::reminder::store::{JsonFileStore, ReminderMap, ReminderStore};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPermission {
    Grant,
    Deny,
}

impl From<CliPermission> for PermissionStatus {
    fn from(value: CliPermission) -> Self {
        match value {
            CliPermission::Grant => PermissionStatus::Granted,
            CliPermission::Deny => PermissionStatus::Denied,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "planbell",
    version,
    about = "Local reminders for a 7-day habit plan"
)]
struct Cli {
    /// Key-value file holding the stored reminder ids.
    #[arg(long, default_value = "planbell-state.json")]
    state: PathBuf,

    /// Device notification queue file.
    #[arg(long, default_value = "planbell-queue.json")]
    queue: PathBuf,

    /// Reminder settings file; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep reminder ids for this user apart from other users.
    #[arg(long)]
    user: Option<String>,

    /// Local time to treat as now, e.g. 2026-03-02T12:00:00.
    #[arg(long)]
    now: Option<NaiveDateTime>,

    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace any scheduled week with reminders for a 7-line plan file.
    Schedule {
        #[arg(long)]
        plan: PathBuf,

        /// Use theme default times for days without an explicit time.
        #[arg(long)]
        suggested_times: bool,

        #[arg(long, conflicts_with = "no_nudge")]
        nudge_time: Option<TimeOfDay>,

        #[arg(long)]
        no_nudge: bool,
    },
    /// Mark a plan day (1-7) complete, cancelling its nudge.
    Complete {
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=7))]
        day: u8,
    },
    /// Cancel every stored plan reminder.
    CancelAll,
    /// Print the stored reminder ids.
    Show,
    /// List notifications waiting in the device queue.
    Pending,
    /// Deliver queued notifications whose time has come.
    DeliverDue,
    /// Grant or deny notification permission on the device queue.
    Permission {
        #[arg(value_enum)]
        status: CliPermission,
    },
    /// Show how a single plan line is interpreted.
    Parse { line: String },
    /// Write the default settings file.
    InitConfig { path: PathBuf },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match &cli.command {
        Command::Schedule {
            plan,
            suggested_times,
            nudge_time,
            no_nudge,
        } => {
            let mut settings = match &cli.config {
                Some(path) => load_settings(path)
                    .with_context(|| format!("failed to load {}", path.display()))?,
                None => ReminderSettings::default(),
            };
            if *suggested_times {
                settings.require_time = false;
            }
            if *no_nudge {
                settings.nudge_time = None;
            } else if let Some(time) = nudge_time {
                settings.nudge_time = Some(*time);
            }
            schedule(&cli, plan, &settings)
        }
        Command::Complete { day } => {
            let mut reminders = open_reminders(&cli)?;
            let day_index = usize::from(*day) - 1;
            if reminders.cancel_nudge_for_day(day_index)? {
                println!("Day {day}: nudge cancelled");
            } else {
                println!("Day {day}: no nudge to cancel");
            }
            Ok(())
        }
        Command::CancelAll => {
            let mut reminders = open_reminders(&cli)?;
            let cancelled = reminders.cancel_all()?;
            println!("cancelled {cancelled} reminder(s)");
            Ok(())
        }
        Command::Show => {
            let reminders = open_reminders(&cli)?;
            print_map(&reminders.stored());
            Ok(())
        }
        Command::Pending => {
            let queue = open_queue(&cli.queue)?;
            println!("notification permission: {:?}", queue.permission());
            println!("{} pending notification(s)", queue.pending().len());
            for notification in queue.pending() {
                println!(
                    "  {}  [{}]  {}: {}",
                    notification.trigger.format("%Y-%m-%d %H:%M"),
                    notification.kind,
                    notification.title,
                    notification.body
                );
            }
            Ok(())
        }
        Command::DeliverDue => {
            let mut queue = open_queue(&cli.queue)?;
            let delivered = queue.deliver_due(clock_for(&cli)?.now())?;
            for notification in &delivered {
                println!("{}: {}", notification.title, notification.body);
            }
            println!("delivered {} notification(s)", delivered.len());
            Ok(())
        }
        Command::Permission { status } => {
            let mut queue = open_queue(&cli.queue)?;
            queue.set_permission((*status).into())?;
            println!("notification permission: {status:?}");
            Ok(())
        }
        Command::Parse { line } => {
            let parsed = split_plan_line(line);
            println!(
                "day: {}",
                parsed.day.map_or_else(|| "-".to_string(), |day| day.to_string())
            );
            println!("theme: {}", parsed.theme);
            println!("body: {}", parsed.body);
            println!(
                "time: {}",
                parse_time(line).map_or_else(|| "-".to_string(), |time| time.to_string())
            );
            println!(
                "lookup theme: {}",
                theme_from_line(line).unwrap_or_else(|| "-".to_string())
            );
            Ok(())
        }
        Command::InitConfig { path } => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            save_settings(path, &ReminderSettings::default())?;
            println!("wrote {}", path.display());
            Ok(())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid --log-level '{level}'"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn open_queue(path: &Path) -> Result<DeviceQueue> {
    DeviceQueue::open(path).with_context(|| format!("failed to open {}", path.display()))
}

fn open_reminders(cli: &Cli) -> Result<PlanReminders<DeviceQueue, JsonFileStore>> {
    let queue = open_queue(&cli.queue)?;
    let kv = JsonFileStore::new(&cli.state);
    let store = match &cli.user {
        Some(user) => ReminderStore::for_user(kv, user),
        None => ReminderStore::new(kv),
    };
    Ok(PlanReminders::new(queue, store, clock_for(cli)?))
}

fn clock_for(cli: &Cli) -> Result<Box<dyn Clock>> {
    let Some(naive) = cli.now else {
        return Ok(Box::new(SystemClock));
    };
    let now = Local
        .from_local_datetime(&naive)
        .earliest()
        .with_context(|| format!("--now {naive} does not exist in the local time zone"))?;
    Ok(Box::new(FixedClock(now)))
}

fn schedule(cli: &Cli, plan_path: &Path, settings: &ReminderSettings) -> Result<()> {
    let plan = load_weekly_plan(plan_path)
        .with_context(|| format!("failed to load {}", plan_path.display()))?;
    println!(
        "timed days: {} of {DAYS_PER_PLAN}",
        count_timed_lines(plan.lines())
    );

    let mut reminders = open_reminders(cli)?;
    let map = reminders
        .schedule_weekly_plan(&plan, &settings.schedule_options())
        .context("unable to schedule reminders")?;

    let trigger_of = |id: &Option<NotificationId>| -> String {
        id.as_ref()
            .and_then(|id| {
                reminders
                    .platform()
                    .pending()
                    .iter()
                    .find(|pending| &pending.id == id)
            })
            .map_or_else(
                || "-".to_string(),
                |pending| pending.trigger.format("%Y-%m-%d %H:%M").to_string(),
            )
    };
    for (index, entry) in map.entries() {
        println!(
            "Day {}: primary {} | nudge {}",
            index + 1,
            trigger_of(&entry.primary),
            trigger_of(&entry.nudge)
        );
    }
    println!(
        "scheduled {} primary and {} nudge reminders",
        map.primary_count(),
        map.nudge_count()
    );
    Ok(())
}

fn print_map(map: &ReminderMap) {
    if map.is_empty() {
        println!("no reminders stored");
        return;
    }
    let show = |id: &Option<NotificationId>| {
        id.as_ref()
            .map_or_else(|| "-".to_string(), NotificationId::to_string)
    };
    for (index, entry) in map.entries() {
        println!(
            "Day {}: primary {} | nudge {}",
            index + 1,
            show(&entry.primary),
            show(&entry.nudge)
        );
    }
}
