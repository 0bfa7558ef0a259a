use crate::reminder::platform::{NotificationId, NotificationPlatform};
use crate::reminder::scheduler::PlanReminders;
use crate::reminder::store::{KeyValueStore, StoreError};

impl<P, S> PlanReminders<P, S>
where
    P: NotificationPlatform,
    S: KeyValueStore,
{
    /// Cancels every stored reminder and forgets the stored ids.
    ///
    /// Returns how many ids were handed to the platform. Safe to call when
    /// nothing was ever scheduled.
    pub fn cancel_all(&mut self) -> Result<usize, StoreError> {
        let map = self.store.load();
        let mut cancelled = 0;
        for (_, entry) in map.entries() {
            for id in entry.ids() {
                self.cancel_quietly(id);
                cancelled += 1;
            }
        }
        self.store.clear()?;
        if cancelled > 0 {
            tracing::info!(cancelled, "cancelled plan reminders");
        }
        Ok(cancelled)
    }

    /// Cancels the nudge for one day once that day is marked complete.
    ///
    /// The day's primary reminder and every other day stay untouched.
    /// Returns `false` when there was no nudge to cancel.
    pub fn cancel_nudge_for_day(&mut self, day_index: usize) -> Result<bool, StoreError> {
        let mut map = self.store.load();
        let Some(entry) = map.get_mut(day_index) else {
            return Ok(false);
        };
        let Some(nudge) = entry.nudge.take() else {
            return Ok(false);
        };
        self.cancel_quietly(&nudge);
        self.store.save(&map)?;
        tracing::info!(day = day_index, id = %nudge, "cancelled nudge for completed day");
        Ok(true)
    }

    // The platform may already have delivered or dropped the notification.
    pub(super) fn cancel_quietly(&mut self, id: &NotificationId) {
        if let Err(err) = self.platform.cancel(id) {
            tracing::warn!(id = %id, error = %err, "ignoring failed notification cancel");
        }
    }
}
