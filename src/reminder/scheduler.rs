use std::collections::BTreeMap;

use chrono::Local;
use thiserror::Error;

use crate::clock::Clock;
use crate::plan::line::{TimeOfDay, parse_time, strip_day_prefix, theme_from_line};
use crate::plan::weekly::WeeklyPlan;
use crate::reminder::platform::{
    NotificationPlatform, NotificationRequest, PermissionStatus, PlatformError, ReminderKind,
};
use crate::reminder::store::{KeyValueStore, ReminderEntry, ReminderMap, ReminderStore, StoreError};
use crate::reminder::trigger::trigger_for_day;

pub const NUDGE_BODY: &str = "Mark today's task as done if you've completed it.";

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("notification permission not granted")]
    PermissionDenied,
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("unable to persist reminder ids: {0}")]
    Storage(#[from] StoreError),
}

/// Default reminder time per plan theme.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ThemeTimes(BTreeMap<String, TimeOfDay>);

impl ThemeTimes {
    pub fn new(times: BTreeMap<String, TimeOfDay>) -> Self {
        Self(times)
    }

    /// Times offered when the plan itself carries none.
    pub fn suggested() -> Self {
        let table = [
            ("Movement", 19, 30),
            ("Nutrition", 16, 0),
            ("Sleep", 22, 15),
            ("Stress", 10, 0),
            ("Strength/Balance", 8, 30),
            ("Social/Outdoors", 19, 0),
            ("Prep/Check-in", 20, 0),
        ];
        Self(
            table
                .into_iter()
                .filter_map(|(theme, hour, minute)| {
                    TimeOfDay::new(hour, minute).map(|time| (theme.to_string(), time))
                })
                .collect(),
        )
    }

    pub fn get(&self, theme: &str) -> Option<TimeOfDay> {
        self.0.get(theme).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TimeOfDay)> {
        self.0.iter().map(|(theme, time)| (theme.as_str(), *time))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScheduleOptions {
    /// Only days whose line contains a clock time get a primary reminder.
    pub require_time: bool,
    /// Consulted only when `require_time` is off and the line has no time.
    pub theme_times: Option<ThemeTimes>,
    /// Same-day nudge on every day, independent of the primary reminder.
    pub nudge_time: Option<TimeOfDay>,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            require_time: true,
            theme_times: None,
            nudge_time: None,
        }
    }
}

/// Schedules and cancels the reminders for one weekly plan.
///
/// Every mutating call takes `&mut self`, so passes over the stored map
/// never interleave.
pub struct PlanReminders<P, S> {
    pub(crate) platform: P,
    pub(crate) store: ReminderStore<S>,
    clock: Box<dyn Clock>,
}

impl<P, S> PlanReminders<P, S>
where
    P: NotificationPlatform,
    S: KeyValueStore,
{
    pub fn new(platform: P, store: ReminderStore<S>, clock: Box<dyn Clock>) -> Self {
        Self {
            platform,
            store,
            clock,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn stored(&self) -> ReminderMap {
        self.store.load()
    }

    /// Replaces any previously scheduled week with reminders for `plan`.
    ///
    /// Permission is checked before anything is cancelled or written. If
    /// scheduling or saving fails partway, whatever this pass already
    /// scheduled is cancelled again before the error is returned.
    pub fn schedule_weekly_plan(
        &mut self,
        plan: &WeeklyPlan,
        options: &ScheduleOptions,
    ) -> Result<ReminderMap, ScheduleError> {
        if self.platform.request_permission()? != PermissionStatus::Granted {
            return Err(ScheduleError::PermissionDenied);
        }

        self.cancel_all()?;

        let mut map = ReminderMap::default();
        let outcome = self
            .schedule_days(plan, options, &mut map)
            .and_then(|()| self.store.save(&map).map_err(ScheduleError::from));
        if let Err(err) = outcome {
            // Nothing from this pass may outlive it without a stored id.
            let mut rolled_back = 0;
            for (_, entry) in map.entries() {
                for id in entry.ids() {
                    self.cancel_quietly(id);
                    rolled_back += 1;
                }
            }
            tracing::warn!(rolled_back, error = %err, "weekly plan scheduling failed");
            return Err(err);
        }

        tracing::info!(
            primary = map.primary_count(),
            nudge = map.nudge_count(),
            "scheduled weekly plan reminders"
        );
        Ok(map)
    }

    /// Records each id in `map` as soon as the platform hands it back.
    fn schedule_days(
        &mut self,
        plan: &WeeklyPlan,
        options: &ScheduleOptions,
        map: &mut ReminderMap,
    ) -> Result<(), ScheduleError> {
        let now = self.clock.now();
        for (index, line) in plan.iter() {
            let day_offset = index as u64;
            map.insert(index, ReminderEntry::default());

            if let Some(time) = primary_time(line, options)
                && let Some(trigger) = trigger_for_day(&now, day_offset, time, &Local)
            {
                let request = NotificationRequest {
                    kind: ReminderKind::Primary,
                    day_index: index,
                    title: format!("Day {}", index + 1),
                    body: strip_day_prefix(line),
                    trigger,
                };
                let id = self.platform.schedule(&request)?;
                tracing::debug!(day = index, id = %id, trigger = %trigger, "scheduled primary reminder");
                map.record(index, ReminderKind::Primary, id);
            }

            if let Some(nudge_time) = options.nudge_time
                && let Some(trigger) = trigger_for_day(&now, day_offset, nudge_time, &Local)
            {
                let request = NotificationRequest {
                    kind: ReminderKind::Nudge,
                    day_index: index,
                    title: format!("Day {} — don't forget", index + 1),
                    body: NUDGE_BODY.to_string(),
                    trigger,
                };
                let id = self.platform.schedule(&request)?;
                tracing::debug!(day = index, id = %id, trigger = %trigger, "scheduled nudge reminder");
                map.record(index, ReminderKind::Nudge, id);
            }
        }
        Ok(())
    }
}

fn primary_time(line: &str, options: &ScheduleOptions) -> Option<TimeOfDay> {
    if let Some(time) = parse_time(line) {
        return Some(time);
    }
    if options.require_time {
        return None;
    }
    let theme_times = options.theme_times.as_ref()?;
    theme_times.get(&theme_from_line(line)?)
}
