// UI layer: everything the commands print, plus the two interactive bits
// (`dialoguer` confirmations and the `indicatif` spinner while waiting for
// sign in). Kept free of API calls so the commands read top to bottom.

use crate::cache::Account;
use crate::dates;
use crate::identity::DeviceFlow;
use crate::models::{Importance, TaskList, TodoTask};
use crate::views::{DetailPick, Located, Overdue, TaskStats};
use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

const RULE_WIDTH: usize = 60;

pub fn success(message: &str) {
    println!("{} {message}", "✓".green());
}

pub fn failure(message: &str) {
    println!("{} {message}", "❌".red());
}

pub fn hint(message: &str) {
    println!("💡 {message}");
}

pub fn list_not_found(name: &str) {
    failure(&format!("List not found: {name}"));
}

pub fn task_not_found(title: &str) {
    failure(&format!("Task not found: {title}"));
}

/// Text of the top-level error line; `verbose` adds the cause chain.
pub fn render_error(err: &anyhow::Error, verbose: bool) -> String {
    let mut text = err.to_string();
    if verbose {
        for cause in err.chain().skip(1) {
            text.push_str(&format!("\n   caused by: {cause}"));
        }
    }
    text
}

pub fn error(err: &anyhow::Error, verbose: bool) {
    eprintln!("{} {}", "❌ Error:".red().bold(), render_error(err, verbose));
}

/// Yes/no prompt, defaulting to no.
pub fn confirm(prompt: &str) -> Result<bool> {
    let answer = Confirm::new().with_prompt(prompt).default(false).interact()?;
    if !answer {
        println!("Cancelled");
    }
    Ok(answer)
}

/// Spinner on stderr until the returned bar is finished or dropped.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

pub fn login_required() {
    println!("\n{} Not logged in", "❌".red());
    println!("\nPlease use the following commands to login:");
    println!("  Step 1: Get authentication info");
    println!("    mstodo login get");
    println!("\n  Step 2: Verify authentication code (login)");
    println!("    mstodo login verify");
}

pub fn login_usage() {
    println!("Please specify login operation: get (get auth info) or verify (verify auth)");
}

pub fn device_flow(flow: &DeviceFlow) {
    success("Verification code generated");
    println!("\nPlease visit the following link to log in:");
    println!("{}", flow.verification_uri.as_str().underlined());
    println!("\nEnter verification code: {}", flow.user_code.as_str().bold());
    println!("\nVerify with command: mstodo login verify");
}

pub fn signed_in(account: &Account) {
    success("Authentication successful! Login information saved, you will be logged in automatically next time.");
    if let Some(username) = &account.username {
        println!("  Signed in as {username}");
    }
    success("You can now start using mstodo");
}

pub fn logged_out(removed: bool) {
    if removed {
        success("Login information cleared");
    } else {
        println!("⚠️  No cached login information found");
    }
}

fn status_label(task: &TodoTask) -> &'static str {
    if task.is_completed() {
        "[Completed]"
    } else {
        "[In Progress]"
    }
}

fn star(task: &TodoTask) -> &'static str {
    if task.is_high_priority() {
        "⭐"
    } else {
        ""
    }
}

/// First `max` characters of `text`.
fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn task_lists(lists: &[TaskList], verbose: bool) {
    if lists.is_empty() {
        println!("No task lists found");
        return;
    }
    println!("\n📋 Task Lists ({} total):\n", lists.len());
    for (i, list) in lists.iter().enumerate() {
        println!("{}. {}", i + 1, list.display_name);
        if verbose {
            println!("   ID: {}", list.id);
            println!(
                "   Created: {}",
                list.created_date_time.as_deref().unwrap_or("N/A")
            );
        }
    }
}

pub fn tasks_in_list(list_name: &str, tasks: &[&TodoTask], verbose: bool) {
    if tasks.is_empty() {
        println!("\n📋 No tasks in list \"{list_name}\"");
        return;
    }
    println!(
        "\n📋 Tasks in list \"{list_name}\" ({} total):\n",
        tasks.len()
    );
    for (i, task) in tasks.iter().enumerate() {
        println!("{}. {} {} {}", i + 1, status_label(task), task.title, star(task));
        if verbose {
            if let Some(notes) = task.notes() {
                println!("   Notes: {}", clip(notes, 100));
            }
            if let Some(due) = &task.due_date_time {
                println!("   Due: {}", due.date_time);
            }
            if !task.categories.is_empty() {
                println!("   Categories: {}", task.categories.join(", "));
            }
        }
    }
}

pub fn task_added(task: &TodoTask, verbose: bool) {
    println!();
    success(&format!("Task added: {}", task.title));
    if verbose {
        println!("  ID: {}", task.id);
        println!("  Priority: {}", task.importance.as_str());
        if let Some(due) = &task.due_date_time {
            println!("  Due date: {}", due.date_time);
        }
    }
}

pub fn search_results(keyword: &str, found: &[Located<'_>], verbose: bool) {
    if found.is_empty() {
        println!("\n🔍 No tasks found containing \"{keyword}\"");
        return;
    }
    println!("\n🔍 Search results ({} found):\n", found.len());
    for (list, task) in found {
        println!("{} {} {}", status_label(task), task.title, star(task));
        println!("   List: {}", list.display_name);
        if verbose {
            if let Some(notes) = task.notes() {
                println!("   Notes: {}", clip(notes, 100));
            }
        }
    }
}

pub fn due_today(found: &[Located<'_>]) {
    if found.is_empty() {
        println!("\n📅 No tasks due today");
        return;
    }
    println!("\n📅 Tasks due today ({} total):\n", found.len());
    for (list, task) in found {
        println!("{} {} {}", status_label(task), task.title, star(task));
        println!("   List: {}", list.display_name);
    }
}

pub fn overdue(late: &[Overdue<'_>]) {
    if late.is_empty() {
        println!();
        success("No overdue tasks");
        return;
    }
    println!("\n⚠️  Overdue tasks ({} total):\n", late.len());
    for item in late {
        println!(
            "{} {} {}",
            status_label(item.task),
            item.task.title,
            star(item.task)
        );
        println!("   List: {}", item.list.display_name);
        println!("   Overdue: {} days", item.days);
    }
}

pub fn pending(found: &[Located<'_>], grouped: bool, verbose: bool) {
    if found.is_empty() {
        println!();
        success("No incomplete tasks");
        return;
    }
    println!("\n📋 All incomplete tasks ({} total):\n", found.len());

    if grouped {
        let mut current: Option<&str> = None;
        for (list, task) in found {
            if current != Some(list.id.as_str()) {
                current = Some(list.id.as_str());
                println!("\n📂 {}:", list.display_name);
            }
            println!("  {} {} {}", status_label(task), task.title, star(task));
            if verbose {
                if let Some(due) = &task.due_date_time {
                    println!("      Due: {}", dates::display(&due.date_time));
                }
                if let Some(notes) = task.notes() {
                    println!("      Notes: {}...", clip(notes, 50));
                }
            }
        }
        return;
    }

    for (list, task) in found {
        println!("{} {} {}", status_label(task), task.title, star(task));
        println!("   List: {}", list.display_name);
        if verbose {
            if let Some(due) = &task.due_date_time {
                println!("   Due: {}", dates::display(&due.date_time));
            }
        }
    }
}

pub fn stats(stats: &TaskStats) {
    println!("\n📊 Task Statistics:\n");
    println!("  Total lists: {}", stats.lists);
    println!("  Total tasks: {}", stats.total);
    println!("  Completed: {}", stats.completed);
    println!("  Pending: {}", stats.pending);
    println!("  High priority: {}", stats.high_priority);
    println!("  Overdue: {}", stats.overdue);
    if let Some(rate) = stats.completion_rate() {
        println!("\n  Completion rate: {rate:.1}%");
    }
}

pub fn exported(path: &Path) {
    success(&format!("Tasks exported to: {}", path.display()));
}

pub fn list_created(list: &TaskList, verbose: bool) {
    success(&format!("List created: {}", list.display_name));
    if verbose {
        println!("  ID: {}", list.id);
    }
}

pub fn detail_choice(pick: DetailPick) {
    match pick {
        DetailPick::Only => {}
        DetailPick::LatestOpen { matches, open } => println!(
            "ℹ️  Found {matches} matching tasks ({open} incomplete), showing latest incomplete"
        ),
        DetailPick::LatestCompleted { matches } => println!(
            "ℹ️  Found {matches} matching tasks (all completed), showing latest completed"
        ),
    }
}

pub fn task_detail(task: &TodoTask, list: &TaskList, verbose: bool) {
    let heavy = "=".repeat(RULE_WIDTH);
    println!("\n{heavy}");
    println!("📌 Task Details");
    println!("{heavy}\n");

    println!("📋 Title: {}", task.title);
    println!("🔖 Status: {}", status_label(task));
    let priority = match task.importance {
        Importance::High => "⭐ High",
        Importance::Normal => "Normal",
        Importance::Low => "Low",
    };
    println!("⚡ Priority: {priority}");

    if let Some(created) = &task.created_date_time {
        println!("📅 Created: {}", dates::display(created));
    }
    if let Some(modified) = &task.last_modified_date_time {
        println!("📝 Modified: {}", dates::display(modified));
    }
    if let Some(due) = &task.due_date_time {
        println!("⏰ Due: {}", dates::display(&due.date_time));
    }
    if let Some(reminder) = &task.reminder_date_time {
        println!("🔔 Reminder: {}", dates::display(&reminder.date_time));
    }
    if let Some(completed) = &task.completed_date_time {
        println!("✅ Completed: {}", dates::display(&completed.date_time));
    }
    if let Some(notes) = task.notes() {
        println!("\n📝 Notes:\n{notes}");
    }
    if !task.categories.is_empty() {
        println!("\n🏷️  Categories: {}", task.categories.join(", "));
    }

    if verbose {
        let light = "─".repeat(RULE_WIDTH);
        println!("\n{light}");
        println!("🔧 Technical Info");
        println!("{light}");
        println!("ID: {}", task.id);
        println!("List ID: {}", list.id);
        if let Some(on) = task.is_reminder_on {
            println!("Reminder: {}", if on { "On" } else { "Off" });
        }
    }

    println!("\n{heavy}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_error_lists_causes() {
        let err = anyhow::anyhow!("disk full").context("Failed to write out.json");
        assert_eq!(render_error(&err, false), "Failed to write out.json");
        assert_eq!(
            render_error(&err, true),
            "Failed to write out.json\n   caused by: disk full"
        );
    }

    #[test]
    fn clip_counts_characters_not_bytes() {
        assert_eq!(clip("héllo wörld", 7), "héllo w");
        assert_eq!(clip("short", 100), "short");
    }
}
