use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

const NOW: &str = "2026-03-02T12:00:00";

fn timed_plan() -> &'static str {
    "Day 1: Movement — walk at 18:30
Day 2: Nutrition — prep lunch
Day 3: Sleep — Go to bed by 22:15
Day 4: Stress — breathe at 7:30 pm
Day 5: Strength/Balance — squats
Day 6: Social/Outdoors — call a friend
Day 7: Prep/Check-in — plan at 9:00 am
"
}

fn untimed_plan() -> &'static str {
    "Day 1: Movement — 30 minute brisk walk
Day 2: Nutrition — swap a snack for fruit
Day 3: Sleep — no screens before bed
Day 4: Stress — five minutes of box breathing
Day 5: Strength/Balance — two rounds of squats
Day 6: Social/Outdoors — call a friend
Day 7: Prep/Check-in — review the week
"
}

fn write_plan(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write plan");
    path
}

fn planbell(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("planbell");
    cmd.arg("--state")
        .arg(dir.join("state.json"))
        .arg("--queue")
        .arg(dir.join("queue.json"))
        .arg("--now")
        .arg(NOW);
    cmd
}

#[test]
fn schedules_timed_days_and_nudges() {
    let dir = tempdir().expect("tempdir");
    let plan = write_plan(dir.path(), "plan.txt", timed_plan());

    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .assert()
        .success()
        .stdout(predicate::str::contains("timed days: 4 of 7"))
        .stdout(predicate::str::contains(
            "Day 1: primary 2026-03-02 18:30 | nudge 2026-03-02 21:00",
        ))
        .stdout(predicate::str::contains(
            "Day 2: primary - | nudge 2026-03-03 21:00",
        ))
        .stdout(predicate::str::contains(
            "scheduled 4 primary and 7 nudge reminders",
        ));

    planbell(dir.path())
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::contains("11 pending notification(s)"))
        .stdout(predicate::str::contains(
            "2026-03-05 19:30  [primary]  Day 4: Stress — breathe at 7:30 pm",
        ));
}

#[test]
fn suggested_times_cover_every_themed_day() {
    let dir = tempdir().expect("tempdir");
    let plan = write_plan(dir.path(), "plan.txt", untimed_plan());

    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .arg("--no-nudge")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "scheduled 0 primary and 0 nudge reminders",
        ));

    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .arg("--suggested-times")
        .arg("--nudge-time")
        .arg("20:30")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Day 3: primary 2026-03-04 22:15 | nudge 2026-03-04 20:30",
        ))
        .stdout(predicate::str::contains(
            "scheduled 7 primary and 7 nudge reminders",
        ));
}

#[test]
fn rescheduling_replaces_previous_week() {
    let dir = tempdir().expect("tempdir");
    let timed = write_plan(dir.path(), "timed.txt", timed_plan());
    let untimed = write_plan(dir.path(), "untimed.txt", untimed_plan());

    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&timed)
        .assert()
        .success();
    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&untimed)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "scheduled 0 primary and 7 nudge reminders",
        ));

    planbell(dir.path())
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::contains("7 pending notification(s)"));
}

#[test]
fn denied_permission_fails_without_touching_reminders() {
    let dir = tempdir().expect("tempdir");
    let plan = write_plan(dir.path(), "plan.txt", timed_plan());

    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .assert()
        .success();
    planbell(dir.path())
        .arg("permission")
        .arg("deny")
        .assert()
        .success();

    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "notification permission not granted",
        ));

    planbell(dir.path())
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::contains("11 pending notification(s)"));
}

#[test]
fn completing_a_day_cancels_only_its_nudge() {
    let dir = tempdir().expect("tempdir");
    let plan = write_plan(dir.path(), "plan.txt", timed_plan());

    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .assert()
        .success();

    planbell(dir.path())
        .args(["complete", "--day", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Day 3: nudge cancelled"));
    planbell(dir.path())
        .args(["complete", "--day", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Day 3: no nudge to cancel"));

    planbell(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Day 3: primary \S+ \| nudge -\n").expect("regex"));
    planbell(dir.path())
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::contains("10 pending notification(s)"));
}

#[test]
fn cancel_all_is_idempotent() {
    let dir = tempdir().expect("tempdir");
    let plan = write_plan(dir.path(), "plan.txt", timed_plan());

    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .assert()
        .success();

    planbell(dir.path())
        .arg("cancel-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("cancelled 11 reminder(s)"));
    planbell(dir.path())
        .arg("cancel-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("cancelled 0 reminder(s)"));

    planbell(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("no reminders stored"));
    planbell(dir.path())
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 pending notification(s)"));
}

#[test]
fn delivered_notifications_can_still_be_cancelled() {
    let dir = tempdir().expect("tempdir");
    let plan = write_plan(dir.path(), "plan.txt", timed_plan());

    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .assert()
        .success();

    let mut deliver = cargo_bin_cmd!("planbell");
    deliver
        .arg("--queue")
        .arg(dir.path().join("queue.json"))
        .arg("--now")
        .arg("2026-03-02T21:30:00")
        .arg("deliver-due")
        .assert()
        .success()
        .stdout(predicate::str::contains("delivered 2 notification(s)"));

    planbell(dir.path())
        .arg("cancel-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("cancelled 11 reminder(s)"));
    planbell(dir.path())
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 pending notification(s)"));
}

#[test]
fn reminders_are_scoped_per_user() {
    let dir = tempdir().expect("tempdir");
    let plan = write_plan(dir.path(), "plan.txt", timed_plan());

    planbell(dir.path())
        .args(["--user", "alice", "schedule", "--plan"])
        .arg(&plan)
        .assert()
        .success();

    planbell(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("no reminders stored"));
    planbell(dir.path())
        .args(["--user", "alice", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Day 7: primary"));
}

#[test]
fn plan_with_wrong_line_count_fails_with_clear_error() {
    let dir = tempdir().expect("tempdir");
    let plan = write_plan(dir.path(), "plan.txt", "Day 1: a\nDay 2: b\nDay 3: c\n");

    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("exactly 7 lines, found 3"));
}

#[test]
fn settings_file_drives_schedule_options() {
    let dir = tempdir().expect("tempdir");
    let plan = write_plan(dir.path(), "plan.txt", untimed_plan());
    let settings = dir.path().join("settings.json");
    fs::write(
        &settings,
        r#"{ "version": 1, "require_time": false, "nudge_time": null, "theme_times": { "Sleep": "23:00" } }"#,
    )
    .expect("write settings");

    planbell(dir.path())
        .arg("--config")
        .arg(&settings)
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Day 3: primary 2026-03-04 23:00 | nudge -",
        ))
        .stdout(predicate::str::contains(
            "scheduled 1 primary and 0 nudge reminders",
        ));
}

#[test]
fn init_config_writes_defaults_once() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.json");

    planbell(dir.path())
        .arg("init-config")
        .arg(&settings)
        .assert()
        .success();
    let text = fs::read_to_string(&settings).expect("read settings");
    assert!(text.contains("\"nudge_time\": \"21:00\""));
    assert!(text.contains("\"Sleep\": \"22:15\""));

    planbell(dir.path())
        .arg("init-config")
        .arg(&settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn parse_reports_line_fields() {
    let mut cmd = cargo_bin_cmd!("planbell");
    cmd.arg("parse")
        .arg("Day 3: Sleep — Go to bed by 22:15")
        .assert()
        .success()
        .stdout(predicate::str::contains("day: 3"))
        .stdout(predicate::str::contains("theme: Sleep"))
        .stdout(predicate::str::contains("body: Go to bed by 22:15"))
        .stdout(predicate::str::contains("time: 22:15"));
}

#[test]
fn complete_rejects_day_outside_week() {
    let dir = tempdir().expect("tempdir");
    planbell(dir.path())
        .args(["complete", "--day", "8"])
        .assert()
        .failure();
}

#[test]
fn corrupt_state_file_is_replaced_on_schedule() {
    let dir = tempdir().expect("tempdir");
    let plan = write_plan(dir.path(), "plan.txt", timed_plan());
    fs::write(dir.path().join("state.json"), "{ broken").expect("write state");

    planbell(dir.path())
        .arg("cancel-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("cancelled 0 reminder(s)"));
    planbell(dir.path())
        .arg("schedule")
        .arg("--plan")
        .arg(&plan)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "scheduled 4 primary and 7 nudge reminders",
        ));
    planbell(dir.path())
        .arg("cancel-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("cancelled 11 reminder(s)"));
    planbell(dir.path())
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::contains("notification permission: Granted"))
        .stdout(predicate::str::contains("0 pending notification(s)"));
}
