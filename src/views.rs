// Read-only views over lists and tasks. No I/O; the commands print these.

use crate::models::{TaskList, TodoTask};
use crate::todo::TaskGroups;
use chrono::{NaiveDate, NaiveDateTime};

/// A task together with the list it lives in.
pub type Located<'a> = (&'a TaskList, &'a TodoTask);

fn located(groups: &TaskGroups) -> impl Iterator<Item = Located<'_>> {
    groups
        .iter()
        .flat_map(|(list, tasks)| tasks.iter().map(move |task| (list, task)))
}

/// Tasks of one list, completed ones only when asked for.
pub fn visible_tasks(tasks: &[TodoTask], include_completed: bool) -> Vec<&TodoTask> {
    tasks
        .iter()
        .filter(|t| include_completed || !t.is_completed())
        .collect()
}

pub fn pending(groups: &TaskGroups) -> Vec<Located<'_>> {
    located(groups).filter(|(_, t)| !t.is_completed()).collect()
}

/// Case-insensitive match on title or notes.
pub fn search<'a>(groups: &'a TaskGroups, keyword: &str) -> Vec<Located<'a>> {
    let keyword = keyword.to_lowercase();
    located(groups)
        .filter(|(_, t)| {
            t.title.to_lowercase().contains(&keyword)
                || t.notes()
                    .is_some_and(|n| n.to_lowercase().contains(&keyword))
        })
        .collect()
}

/// Open tasks due on `day`.
pub fn due_on(groups: &TaskGroups, day: NaiveDate) -> Vec<Located<'_>> {
    located(groups)
        .filter(|(_, t)| !t.is_completed() && t.due().is_some_and(|d| d.date() == day))
        .collect()
}

pub struct Overdue<'a> {
    pub list: &'a TaskList,
    pub task: &'a TodoTask,
    pub days: i64,
}

/// Open tasks due before `now`, most overdue first.
pub fn overdue(groups: &TaskGroups, now: NaiveDateTime) -> Vec<Overdue<'_>> {
    let mut late: Vec<_> = located(groups)
        .filter(|(_, t)| !t.is_completed())
        .filter_map(|(list, task)| {
            let due = task.due()?;
            (due < now).then(|| Overdue {
                list,
                task,
                days: (now - due).num_days(),
            })
        })
        .collect();
    late.sort_by(|a, b| b.days.cmp(&a.days));
    late
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskStats {
    pub lists: usize,
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high_priority: usize,
    pub overdue: usize,
}

impl TaskStats {
    /// High priority and overdue only count open tasks.
    pub fn collect(groups: &TaskGroups, now: NaiveDateTime) -> Self {
        let mut stats = TaskStats {
            lists: groups.len(),
            ..Default::default()
        };
        for (_, task) in located(groups) {
            stats.total += 1;
            if task.is_completed() {
                stats.completed += 1;
                continue;
            }
            stats.pending += 1;
            if task.is_high_priority() {
                stats.high_priority += 1;
            }
            if task.due().is_some_and(|d| d < now) {
                stats.overdue += 1;
            }
        }
        stats
    }

    /// Percentage, or `None` when there are no tasks.
    pub fn completion_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.completed as f64 / self.total as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailPick {
    Only,
    /// Several matches; the most recently modified open one was chosen.
    LatestOpen { matches: usize, open: usize },
    /// Several matches, all completed; the most recently modified was chosen.
    LatestCompleted { matches: usize },
}

/// Pick the task `detail` shows for a partial, case-insensitive title.
pub fn pick_detail<'a>(tasks: &'a [TodoTask], query: &str) -> Option<(&'a TodoTask, DetailPick)> {
    let query = query.to_lowercase();
    let matched: Vec<&TodoTask> = tasks
        .iter()
        .filter(|t| t.title.to_lowercase().contains(&query))
        .collect();

    let latest = |candidates: &[&'a TodoTask]| {
        candidates
            .iter()
            .copied()
            .max_by(|a, b| a.last_modified_date_time.cmp(&b.last_modified_date_time))
    };

    match matched.as_slice() {
        [] => None,
        [only] => Some((*only, DetailPick::Only)),
        _ => {
            let open: Vec<&TodoTask> = matched
                .iter()
                .copied()
                .filter(|t| !t.is_completed())
                .collect();
            if open.is_empty() {
                latest(&matched).map(|t| {
                    (
                        t,
                        DetailPick::LatestCompleted {
                            matches: matched.len(),
                        },
                    )
                })
            } else {
                latest(&open).map(|t| {
                    (
                        t,
                        DetailPick::LatestOpen {
                            matches: matched.len(),
                            open: open.len(),
                        },
                    )
                })
            }
        }
    }
}
