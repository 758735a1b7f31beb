// src/main.rs

use std::process::ExitCode;

use medspa_scheduler::availability::{self, DEFAULT_OPEN_SLOT_LIMIT};
use medspa_scheduler::config::Config;
use medspa_scheduler::models::{AppointmentFilter, AppointmentStatus, AvailabilityQuery};
use medspa_scheduler::{SchedulingError, SpaStore};

use serde_json::Value;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage:
  medspa-scheduler availability <YYYY-MM-DD> [--staff <id>] [--service <id>]
  medspa-scheduler slots <YYYY-MM-DD> [--staff <id>] [--service <id>]
  medspa-scheduler schedule <YYYY-MM-DD>
  medspa-scheduler appointments <YYYY-MM-DD> [--staff <id>] [--status <status>]";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    // stdout carries the JSON result, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(2));
    };
    if !matches!(command.as_str(), "availability" | "slots" | "schedule" | "appointments") {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(2));
    }

    let cfg = Config::from_env()?;
    let store = SpaStore::from_config(&cfg).await?;

    match run(&store, command, rest).await {
        Ok(json) => {
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => match e.downcast_ref::<SchedulingError>() {
            Some(err) => {
                println!("{}", serde_json::to_string_pretty(&err.to_error_response())?);
                Ok(ExitCode::FAILURE)
            }
            None => Err(e),
        },
    }
}

async fn run(store: &SpaStore, command: &str, args: &[String]) -> anyhow::Result<Value> {
    let (query, status) = parse_args(args)?;
    let json = match command {
        "availability" => serde_json::to_value(store.availability(&query).await?)?,
        "slots" => serde_json::to_value(store.open_slots(&query, DEFAULT_OPEN_SLOT_LIMIT).await?)?,
        "appointments" => serde_json::to_value(
            store
                .appointments(&AppointmentFilter {
                    date: Some(query.date),
                    client_id: None,
                    staff_id: query.staff_id,
                    status,
                })
                .await,
        )?,
        _ => serde_json::to_value(store.daily_schedule(query.date).await)?,
    };
    Ok(json)
}

fn parse_args(
    args: &[String],
) -> Result<(AvailabilityQuery, Option<AppointmentStatus>), SchedulingError> {
    let (date, flags) = args
        .split_first()
        .ok_or_else(|| SchedulingError::Validation("a date is required".into()))?;

    let mut query = AvailabilityQuery {
        date: availability::parse_date(date)?,
        staff_id: None,
        service_id: None,
    };
    let mut status = None;

    let mut it = flags.iter();
    while let Some(flag) = it.next() {
        let value = it
            .next()
            .ok_or_else(|| SchedulingError::Validation(format!("{flag} needs a value")))?;
        match flag.as_str() {
            "--staff" => query.staff_id = Some(value.clone()),
            "--service" => query.service_id = Some(value.clone()),
            "--status" => status = Some(value.parse().map_err(SchedulingError::Validation)?),
            other => return Err(SchedulingError::Validation(format!("unknown flag {other}"))),
        }
    }
    Ok((query, status))
}
