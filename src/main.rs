use clap::{Args, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flock::api::{ExportFormat, SortOrder};
use flock::auth::TokenStore;
use flock::config::{Config, LogConfig};
use flock::journeys::{JourneyFilters, JourneyStatus};
use flock::tasks::{TaskFilters, TaskPriority, TaskStatus};
use flock::Flock;

#[derive(Parser, Debug)]
#[command(name = "flock")]
#[command(about = "Member journeys and follow-up tasks from the terminal")]
#[command(version)]
struct Cli {
  /// Path to config file (default: $XDG_CONFIG_HOME/flock/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Member journeys
  #[command(subcommand)]
  Journeys(JourneyCommand),
  /// Follow-up tasks
  #[command(subcommand)]
  Tasks(TaskCommand),
  /// Store an API token for later calls
  Login {
    #[arg(long)]
    token: String,
  },
  /// Forget the stored API token
  Logout,
}

#[derive(Subcommand, Debug)]
enum JourneyCommand {
  List(JourneyListArgs),
  Show {
    id: u64,
    /// Include milestone progress
    #[arg(long)]
    milestones: bool,
  },
  Stats,
  Export {
    id: u64,
    #[arg(long, value_parser = parse_wire::<ExportFormat>, default_value = "json")]
    format: ExportFormat,
    /// Output file (default: journey-<id>.<format>)
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
}

#[derive(Args, Debug)]
struct JourneyListArgs {
  #[arg(long, value_parser = parse_wire::<JourneyStatus>)]
  status: Option<JourneyStatus>,
  #[arg(long)]
  mentor: Option<u64>,
  #[arg(long = "template")]
  templates: Vec<u64>,
  #[arg(long)]
  search: Option<String>,
  #[arg(long, value_parser = parse_wire::<SortOrder>)]
  order: Option<SortOrder>,
  #[arg(long)]
  page: Option<u32>,
  #[arg(long)]
  limit: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
  List(TaskListArgs),
  Show {
    id: u64,
    /// Include comments
    #[arg(long)]
    comments: bool,
  },
  Complete {
    #[arg(required = true)]
    ids: Vec<u64>,
  },
  Stats,
}

#[derive(Args, Debug)]
struct TaskListArgs {
  #[arg(long, value_parser = parse_wire::<TaskStatus>)]
  status: Option<TaskStatus>,
  #[arg(long, value_parser = parse_wire::<TaskPriority>)]
  priority: Option<TaskPriority>,
  #[arg(long)]
  assignee: Option<u64>,
  #[arg(long = "category")]
  categories: Vec<String>,
  #[arg(long)]
  search: Option<String>,
  #[arg(long)]
  page: Option<u32>,
  #[arg(long)]
  limit: Option<u32>,
}

/// Parse a CLI value using the enum's wire name (e.g. `in_progress`).
fn parse_wire<T: DeserializeOwned>(value: &str) -> std::result::Result<T, String> {
  serde_json::from_value(serde_json::Value::String(value.to_string()))
    .map_err(|_| format!("unknown value '{}'", value))
}

fn init_tracing(log: &LogConfig) -> Result<Option<WorkerGuard>> {
  let filter = match std::env::var("RUST_LOG") {
    Ok(directives) => EnvFilter::new(directives),
    Err(_) => EnvFilter::new(log.filter.as_deref().unwrap_or("flock=info")),
  };

  match &log.file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
      let appender = tracing_appender::rolling::never(dir, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);

      tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
      Ok(None)
    }
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

async fn run_journeys(flock: &Flock, command: JourneyCommand) -> Result<()> {
  let journeys = flock.journeys();
  match command {
    JourneyCommand::List(args) => {
      let filters = JourneyFilters {
        status: args.status,
        mentor_id: args.mentor,
        template_ids: args.templates,
        search: args.search,
        sort_order: args.order,
        page: args.page,
        limit: args.limit,
        ..JourneyFilters::default()
      };
      print_json(&journeys.list(&filters).await?)
    }
    JourneyCommand::Show { id, milestones } => {
      print_json(&journeys.get_by_id(id).await?)?;
      if milestones {
        print_json(&journeys.milestone_progress(id).await?)?;
      }
      Ok(())
    }
    JourneyCommand::Stats => print_json(&journeys.stats(&JourneyFilters::default()).await?),
    JourneyCommand::Export { id, format, output } => {
      let blob = journeys.export(id, format).await?;
      let path = output
        .unwrap_or_else(|| PathBuf::from(format!("journey-{}.{}", id, format.extension())));
      blob.save(&path)?;
      info!(bytes = blob.len(), path = %path.display(), "Saved journey export");
      println!("{}", path.display());
      Ok(())
    }
  }
}

async fn run_tasks(flock: &Flock, command: TaskCommand) -> Result<()> {
  let tasks = flock.tasks();
  match command {
    TaskCommand::List(args) => {
      let filters = TaskFilters {
        status: args.status,
        priority: args.priority,
        assigned_to: args.assignee,
        categories: args.categories,
        search: args.search,
        page: args.page,
        limit: args.limit,
        ..TaskFilters::default()
      };
      print_json(&tasks.list(&filters).await?)
    }
    TaskCommand::Show { id, comments } => {
      print_json(&tasks.get_by_id(id).await?)?;
      if comments {
        print_json(&tasks.comments(id).await?)?;
      }
      Ok(())
    }
    TaskCommand::Complete { ids } => match ids.as_slice() {
      [id] => print_json(&tasks.complete(*id).await?),
      _ => print_json(&tasks.bulk_complete(&ids).await?),
    },
    TaskCommand::Stats => print_json(&tasks.stats(&TaskFilters::default()).await?),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let cli = Cli::parse();
  let config = Config::load(cli.config.as_deref())?;
  let _guard = init_tracing(&config.log)?;

  match cli.command {
    Command::Login { token } => {
      let store = TokenStore::new(config.token_path()?);
      store.save(&token)?;
      info!(path = %store.path().display(), "Stored API token");
    }
    Command::Logout => {
      let flock = Flock::new(&config, config.token_source()?)?;
      flock.logout(&TokenStore::new(config.token_path()?))?;
      info!("Removed stored API token");
    }
    Command::Journeys(command) => {
      let flock = Flock::new(&config, config.token_source()?)?;
      run_journeys(&flock, command).await?;
    }
    Command::Tasks(command) => {
      let flock = Flock::new(&config, config.token_source()?)?;
      run_tasks(&flock, command).await?;
    }
  }

  Ok(())
}
