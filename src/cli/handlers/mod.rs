use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::api::{ApiError, HttpTaskStore};
use crate::io::cache::{CacheKey, QueryClient};
use crate::io::config_io;
use crate::model::task::{NewTask, Task, TaskUpdate};
use crate::ops::filter::{FilterEngine, TaskFilters};
use crate::ops::mutation::TaskMutations;
use crate::ops::sort::sort_by_due_date;

type Client = QueryClient<HttpTaskStore>;

/// Everything a command needs to talk to the task store
struct Context {
    client: Arc<Client>,
    mutations: TaskMutations<Client, HttpTaskStore>,
    debounce: Duration,
    json: bool,
    now: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config_io::load_config(cli.config.as_deref().map(Path::new))?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    debug!(base_url = %config.api.base_url, "using task store");

    let store = Arc::new(HttpTaskStore::new(&config.api)?);
    let client = Arc::new(QueryClient::new(Arc::clone(&store)));
    let ctx = Context {
        mutations: TaskMutations::new(Arc::clone(&client), store),
        client,
        debounce: Duration::from_millis(config.filter.debounce_ms),
        json: cli.json,
        now: Utc::now(),
    };

    match cli.command {
        // Read commands
        Commands::List(args) => cmd_list(&ctx, args).await,
        Commands::Show(args) => cmd_show(&ctx, args).await,

        // Write commands
        Commands::Add(args) => cmd_add(&ctx, args).await,
        Commands::Update(args) => cmd_update(&ctx, args).await,
        Commands::Toggle(args) => cmd_toggle(&ctx, args).await,
        Commands::Delete(args) => cmd_delete(&ctx, args).await,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_tasks(ctx: &Context) -> Result<Vec<Task>, ApiError> {
    let value = ctx.client.query(&CacheKey::Tasks).await?;
    Ok(value.into_tasks().unwrap_or_default())
}

async fn load_task(ctx: &Context, id: &str) -> Result<Task, ApiError> {
    ctx.client
        .query(&CacheKey::task(id))
        .await?
        .into_task()
        .ok_or_else(|| ApiError::new(404, "Task not found"))
}

/// Look the task up in the collection first so the cache holds both entries
async fn find_task(ctx: &Context, id: &str) -> Result<Task, ApiError> {
    let tasks = load_tasks(ctx).await?;
    match tasks.into_iter().find(|t| t.id == id) {
        Some(task) => Ok(task),
        None => load_task(ctx, id).await,
    }
}

fn print_task(task: &Task, verb: &str, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        println!("{}: {}", verb, format_task_line(task, ctx.now));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

async fn cmd_list(ctx: &Context, args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let tasks = load_tasks(ctx).await?;

    let mut engine = FilterEngine::new(ctx.debounce);
    if let Some(text) = args.text {
        engine.set_filter_text(text);
    }
    engine.set_filters(TaskFilters {
        show_complete: args.complete,
        show_incomplete: args.incomplete,
        show_overdue: args.overdue,
    });
    engine.commit();

    let mut filtered = engine.apply(&tasks, ctx.now);
    sort_by_due_date(&mut filtered.tasks);

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&list_to_json(&filtered))?);
    } else {
        for line in format_task_list(&filtered, ctx.now) {
            println!("{}", line);
        }
    }
    Ok(())
}

async fn cmd_show(ctx: &Context, args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let task = load_task(ctx, &args.id).await?;
    if ctx.json {
        let out = TaskDetailJson {
            is_overdue: task.is_overdue(ctx.now),
            task: &task,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for line in format_task_detail(&task, ctx.now) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

async fn cmd_add(ctx: &Context, args: AddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let new_task = NewTask {
        title: args.title,
        detail: args.detail,
        due_at: args.due,
    };
    new_task.validate()?;
    let created = ctx.mutations.create(&new_task).await?;
    print_task(&created, "created", ctx)
}

async fn cmd_update(ctx: &Context, args: UpdateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let current = find_task(ctx, &args.id).await?;
    let mut update = TaskUpdate::from_task(&current);
    if let Some(title) = args.title {
        update.title = title;
    }
    if let Some(detail) = args.detail {
        update.detail = Some(detail);
    }
    if let Some(due) = args.due {
        update.due_at = Some(due);
    }
    if args.complete {
        update.is_complete = true;
    } else if args.incomplete {
        update.is_complete = false;
    }
    update.validate()?;

    let updated = ctx.mutations.update(&args.id, &update).await?;
    print_task(&updated, "updated", ctx)
}

async fn cmd_toggle(ctx: &Context, args: ToggleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let current = find_task(ctx, &args.id).await?;
    let toggled = ctx
        .mutations
        .toggle_complete(&args.id, !current.is_complete)
        .await?;
    print_task(&toggled, "toggled", ctx)
}

async fn cmd_delete(ctx: &Context, args: DeleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    ctx.mutations.delete(&args.id).await?;
    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&DeletedJson { deleted: &args.id })?
        );
    } else {
        println!("deleted: {}", args.id);
    }
    Ok(())
}
