//! Tests for rule-based intent classification.

use crate::clock::FixedClock;
use crate::message::domain::{Intent, classify, normalize_for_matching};
use crate::task::domain::{FestivalId, NewTask, Task, TaskStatus, TaskTitle};
use chrono::{Duration, TimeZone, Utc};
use rstest::{fixture, rstest};

#[fixture]
fn clock() -> FixedClock {
    FixedClock::new(
        Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0)
            .single()
            .expect("valid instant"),
    )
}

fn open_task(title: &str, clock: &FixedClock) -> Task {
    Task::new(
        NewTask::new(FestivalId::new(), TaskTitle::new(title).expect("valid title")),
        clock,
    )
}

#[rstest]
#[case("タスク: 会場設営をする", "会場設営をする")]
#[case("タスク：会場設営をする", "会場設営をする")]
#[case("TODO: チラシ印刷", "チラシ印刷")]
#[case("todo:チラシ印刷", "チラシ印刷")]
#[case("Task : book the PA system", "book the PA system")]
#[case("【タスク】ゴミ袋の買い出し", "ゴミ袋の買い出し")]
#[case("#task 駐車場の確保", "駐車場の確保")]
#[case("  タスク: 前後の空白  ", "前後の空白")]
fn creation_markers_extract_title(#[case] text: &str, #[case] expected: &str) {
    assert_eq!(
        classify(text, &[]),
        Intent::TaskCreation {
            title: expected.to_owned()
        }
    );
}

#[rstest]
#[case("タスク:")]
#[case("TODO:    ")]
#[case("【タスク】")]
#[case("#task")]
fn marker_without_title_is_unrecognized(#[case] text: &str) {
    assert_eq!(classify(text, &[]), Intent::Unrecognized);
}

#[rstest]
fn long_titles_are_truncated_to_limit() {
    let text = format!("タスク: {}", "あ".repeat(150));
    let Intent::TaskCreation { title } = classify(&text, &[]) else {
        panic!("expected task creation");
    };
    assert_eq!(title.chars().count(), TaskTitle::MAX_CHARS);
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("おはようございます")]
#[case("明日のタスク:確認しておいて")]
#[case("#tasks are fun")]
fn ordinary_text_is_none(#[case] text: &str) {
    assert_eq!(classify(text, &[]), Intent::None);
}

#[rstest]
fn completion_matches_open_task_title(clock: FixedClock) {
    let task = open_task("音響チェック", &clock);

    let intent = classify("音響チェック完了", std::slice::from_ref(&task));

    assert_eq!(intent, Intent::TaskCompletion { task_id: task.id() });
}

#[rstest]
fn completion_match_ignores_width_case_and_spaces(clock: FixedClock) {
    let task = open_task("PA チェック", &clock);

    let intent = classify("ｐａチェック　ｄｏｎｅ", std::slice::from_ref(&task));

    assert_eq!(intent, Intent::TaskCompletion { task_id: task.id() });
}

#[rstest]
fn completion_prefers_most_recent_match(clock: FixedClock) {
    let older = open_task("設営", &clock);
    clock.advance(Duration::minutes(10));
    let newer = open_task("設営", &clock);

    let intent = classify("設営終わった", &[older, newer.clone()]);

    assert_eq!(intent, Intent::TaskCompletion { task_id: newer.id() });
}

#[rstest]
fn completion_without_matching_task_is_unrecognized(clock: FixedClock) {
    let task = open_task("音響チェック", &clock);

    assert_eq!(classify("照明完了", &[task]), Intent::Unrecognized);
}

#[rstest]
fn completion_skips_closed_tasks(clock: FixedClock) {
    let mut task = open_task("受付", &clock);
    task.transition_to(TaskStatus::Cancelled, &clock)
        .expect("pending task can be cancelled");

    assert_eq!(classify("受付完了", &[task]), Intent::Unrecognized);
}

#[rstest]
fn creation_marker_takes_precedence_over_completion(clock: FixedClock) {
    let task = open_task("音響チェック", &clock);

    assert_eq!(
        classify("タスク: 音響チェック完了の報告", &[task]),
        Intent::TaskCreation {
            title: "音響チェック完了の報告".to_owned()
        }
    );
}

#[rstest]
fn classification_is_deterministic(clock: FixedClock) {
    let tasks = vec![open_task("買い出し", &clock), open_task("会場清掃", &clock)];
    let first = classify("会場清掃済み", &tasks);
    let second = classify("会場清掃済み", &tasks);
    assert_eq!(first, second);
}

#[rstest]
#[case("ＡＢＣ　ｄｅｆ", "abcdef")]
#[case("Done !", "done!")]
#[case("会場 設営", "会場設営")]
fn normalization_folds_width_case_and_whitespace(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(normalize_for_matching(raw), expected);
}
