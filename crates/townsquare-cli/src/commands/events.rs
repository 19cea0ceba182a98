use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Args;
use townsquare_core::{
    AggregatorContext, Config, Database, Event, EventProvider, ProviderRegistry, ViewerContext,
    ViewerFilter,
};

#[derive(Args)]
pub struct EventsArgs {
    /// Course ids, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    courses: Vec<i64>,
    /// Window start (unix seconds or RFC 3339); defaults from feed.lookback_days
    #[arg(long, value_parser = parse_time)]
    start: Option<i64>,
    /// Window end (unix seconds or RFC 3339); defaults from feed.lookahead_days
    #[arg(long, value_parser = parse_time)]
    end: Option<i64>,
    /// Viewing user id
    #[arg(long)]
    user: i64,
    /// Evaluation time for availability dates (defaults to now)
    #[arg(long, value_parser = parse_time)]
    at: Option<i64>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn parse_time(value: &str) -> Result<i64, String> {
    if let Ok(secs) = value.parse::<i64>() {
        return Ok(secs);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp())
        .map_err(|e| format!("expected unix seconds or RFC 3339 time: {e}"))
}

struct CliHost {
    db: Database,
    courses: Vec<i64>,
    time_start: i64,
    time_end: i64,
    viewer: ViewerContext,
}

impl AggregatorContext for CliHost {
    fn database(&self) -> &Database {
        &self.db
    }
    fn courses(&self) -> Vec<i64> {
        self.courses.clone()
    }
    fn time_start(&self) -> i64 {
        self.time_start
    }
    fn time_end(&self) -> i64 {
        self.time_end
    }
    fn viewer(&self) -> &dyn ViewerFilter {
        &self.viewer
    }
}

fn format_time(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

fn print_event(event: &Event) {
    println!(
        "{}  {:<20}  {}  (course {}, event {})",
        format_time(event.timestart),
        event.eventtype,
        event.instancename.as_deref().unwrap_or(&event.name),
        event.courseid,
        event.id,
    );
}

pub fn run(
    args: EventsArgs,
    config: &Config,
    db_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = match db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::open_at(&config.database_path()?)?,
    };

    let now = args.at.unwrap_or_else(|| Utc::now().timestamp());
    let (default_start, default_end) = config.default_window(now);
    let viewer = ViewerContext::load(&db, args.user, now)?;

    let host = CliHost {
        db,
        courses: args.courses,
        time_start: args.start.unwrap_or(default_start),
        time_end: args.end.unwrap_or(default_end),
        viewer,
    };

    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(EventProvider::from_config(&config.feed)));

    let events = registry.collect_events(&host)?;
    tracing::info!(count = events.len(), user = args.user, "listed events");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else if events.is_empty() {
        println!("no events");
    } else {
        for event in &events {
            print_event(event);
        }
    }
    Ok(())
}
