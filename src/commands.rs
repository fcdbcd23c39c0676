// Command bodies. Each one authenticates (unless it is sign-in management),
// talks to the API through `TodoClient` and hands the result to `ui`.

use crate::api::RequestDispatcher;
use crate::cli::{Command, LoginAction};
use crate::dates;
use crate::error::AuthError;
use crate::models::{DateTimeTimeZone, ItemBody, NewTask, TaskList, TodoTask};
use crate::session::Session;
use crate::todo::TodoClient;
use crate::ui;
use crate::views::{self, TaskStats};
use anyhow::{anyhow, Context, Result};
use chrono::{Local, Utc};
use serde_json::{Map, Value};
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;

pub fn run(
    command: Command,
    verbose: bool,
    session: &mut Session,
    dispatcher: &RequestDispatcher,
) -> Result<ExitCode> {
    match command {
        Command::Login { action } => return login(action, session),
        Command::Logout => {
            let removed = session.logout().context("Failed to clear login information")?;
            ui::logged_out(removed);
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    if !session.authenticate(false) {
        ui::login_required();
        return Ok(ExitCode::FAILURE);
    }
    let client = TodoClient::new(session, dispatcher);
    debug!(?command, "running command");

    match command {
        Command::Lists => {
            let lists = client.task_lists()?;
            ui::task_lists(&lists, verbose);
        }
        Command::Tasks { list, all } => {
            let Some(task_list) = list_or_report(&client, &list)? else {
                return Ok(ExitCode::FAILURE);
            };
            let tasks = client.tasks(&task_list.id)?;
            ui::tasks_in_list(&list, &views::visible_tasks(&tasks, all), verbose);
        }
        Command::Add {
            title,
            list,
            due,
            priority,
            description,
            tags,
            create_list,
        } => {
            let task_list = match client.find_list_by_name(&list)? {
                Some(found) => found,
                None if create_list => {
                    let created = client.create_task_list(&list)?;
                    ui::success(&format!("List created: {list}"));
                    created
                }
                None => {
                    ui::list_not_found(&list);
                    ui::hint("Use --create-list to create the list automatically");
                    return Ok(ExitCode::FAILURE);
                }
            };
            let today = Local::now().date_naive();
            let new_task = NewTask {
                title,
                importance: priority,
                body: description.map(ItemBody::text),
                due_date_time: due
                    .map(|input| DateTimeTimeZone::utc(dates::resolve_due(&input, today))),
                reminder_date_time: None,
                categories: tags.as_deref().map(split_tags),
            };
            let task = client.create_task(&task_list.id, &new_task)?;
            ui::task_added(&task, verbose);
        }
        Command::Complete { title, list } => {
            let Some((task_list, task)) = task_or_report(&client, &list, &title)? else {
                return Ok(ExitCode::FAILURE);
            };
            client.complete_task(&task_list.id, &task.id)?;
            ui::success(&format!("Task completed: {title}"));
        }
        Command::Delete { title, list, yes } => {
            let Some((task_list, task)) = task_or_report(&client, &list, &title)? else {
                return Ok(ExitCode::FAILURE);
            };
            if !yes && !ui::confirm(&format!("Confirm delete task \"{title}\"?"))? {
                return Ok(ExitCode::SUCCESS);
            }
            client.delete_task(&task_list.id, &task.id)?;
            ui::success(&format!("Task deleted: {title}"));
        }
        Command::Detail { title, list } => {
            let Some(task_list) = list_or_report(&client, &list)? else {
                return Ok(ExitCode::FAILURE);
            };
            let tasks = client.tasks(&task_list.id)?;
            let Some((task, pick)) = views::pick_detail(&tasks, &title) else {
                ui::task_not_found(&title);
                return Ok(ExitCode::FAILURE);
            };
            ui::detail_choice(pick);
            ui::task_detail(task, &task_list, verbose);
        }
        Command::Search { keyword } => {
            let groups = client.all_tasks()?;
            ui::search_results(&keyword, &views::search(&groups, &keyword), verbose);
        }
        Command::Today => {
            let groups = client.all_tasks()?;
            let today = Utc::now().date_naive();
            ui::due_today(&views::due_on(&groups, today));
        }
        Command::Overdue => {
            let groups = client.all_tasks()?;
            ui::overdue(&views::overdue(&groups, Utc::now().naive_utc()));
        }
        Command::Pending { group } => {
            let groups = client.all_tasks()?;
            ui::pending(&views::pending(&groups), group, verbose);
        }
        Command::Stats => {
            let groups = client.all_tasks()?;
            ui::stats(&TaskStats::collect(&groups, Utc::now().naive_utc()));
        }
        Command::Export { output } => {
            let groups = client.all_tasks()?;
            export(groups, &output)?;
            ui::exported(&output);
        }
        Command::CreateList { name } => {
            let created = client.create_task_list(&name)?;
            ui::list_created(&created, verbose);
        }
        Command::DeleteList { name, yes } => {
            let Some(task_list) = list_or_report(&client, &name)? else {
                return Ok(ExitCode::FAILURE);
            };
            if !yes && !ui::confirm(&format!("Confirm delete list \"{name}\" and all its tasks?"))? {
                return Ok(ExitCode::SUCCESS);
            }
            client.delete_task_list(&task_list.id)?;
            ui::success(&format!("List deleted: {name}"));
        }
        Command::Login { .. } | Command::Logout => {}
    }
    Ok(ExitCode::SUCCESS)
}

fn login(action: Option<LoginAction>, session: &mut Session) -> Result<ExitCode> {
    match action {
        None => {
            ui::login_usage();
            Ok(ExitCode::FAILURE)
        }
        Some(LoginAction::Get) => {
            let flow = session
                .initiate_flow()
                .map_err(|e| anyhow!("Cannot create device code flow: {e}"))?;
            ui::device_flow(&flow);
            Ok(ExitCode::SUCCESS)
        }
        Some(LoginAction::Verify) => {
            let spinner = ui::spinner("Waiting for the code to be entered...");
            let outcome = session.complete_flow();
            spinner.finish_and_clear();
            match outcome {
                Ok(account) => {
                    ui::signed_in(&account);
                    Ok(ExitCode::SUCCESS)
                }
                Err(AuthError::NoPendingFlow) => {
                    ui::failure("No flow information found to verify");
                    ui::hint("Please run first: mstodo login get");
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => Err(anyhow!("Authentication failed: {e}")),
            }
        }
    }
}

fn list_or_report(client: &TodoClient<'_>, name: &str) -> Result<Option<TaskList>> {
    let found = client.find_list_by_name(name)?;
    if found.is_none() {
        ui::list_not_found(name);
    }
    Ok(found)
}

fn task_or_report(
    client: &TodoClient<'_>,
    list: &str,
    title: &str,
) -> Result<Option<(TaskList, TodoTask)>> {
    let Some(task_list) = list_or_report(client, list)? else {
        return Ok(None);
    };
    match client.find_task_by_title(&task_list.id, title)? {
        Some(task) => Ok(Some((task_list, task))),
        None => {
            ui::task_not_found(title);
            Ok(None)
        }
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// `{ "<list name>": [tasks...] }`, pretty printed.
fn export_document(groups: crate::todo::TaskGroups) -> Result<Value> {
    let mut document = Map::new();
    for (list, tasks) in groups {
        document.insert(list.display_name, serde_json::to_value(tasks)?);
    }
    Ok(Value::Object(document))
}

fn export(groups: crate::todo::TaskGroups, path: &Path) -> Result<()> {
    let document = export_document(groups)?;
    let text = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}
