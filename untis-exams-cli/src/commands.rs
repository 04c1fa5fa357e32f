use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use untis_exams_core::{codec, prelude::*};

use crate::config::Config;

const ACCESS_TOKEN_ENV: &str = "GOOGLE_ACCESS_TOKEN";

/// Fetch window given on the command line, in the configured date format.
pub struct RangeParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Search schools command
pub async fn search_command(query: String) -> Result<()> {
    let schools = SchoolSearch::new()?.search(&query).await?;

    if schools.is_empty() {
        println!("No schools found for '{}'", query);
        return Ok(());
    }

    println!("Found {} schools:", schools.len());
    for school in schools {
        println!("  {} ({})", school.display_name, school.login_name);
        println!("    server: {}", school.server);
        if let Some(address) = school.address.as_deref().filter(|a| !a.is_empty()) {
            println!("    address: {}", address);
        }
    }

    Ok(())
}

/// List exams command
pub async fn exams_command(config: Config, range: RangeParams) -> Result<()> {
    let store = fetch_store(&config, &range).await?;

    if store.is_empty() {
        println!("No exams scheduled");
        return Ok(());
    }

    println!("{} exams:", store.len());
    for exam in &store {
        println!(
            "  {} {}-{}  {}",
            config.format_date(exam.date),
            codec::encode_time(exam.start_time),
            codec::encode_time(exam.end_time),
            exam.subject
        );
        if let Some(name) = &exam.name {
            println!("    {}", name);
        }
    }

    Ok(())
}

/// Push exams to Google Calendar command
pub async fn push_command(
    config: Config,
    range: RangeParams,
    access_token: Option<String>,
) -> Result<()> {
    let access_token = access_token
        .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            anyhow!("Missing access token: set {ACCESS_TOKEN_ENV} or pass --access-token")
        })?;
    let options = SyncOptions {
        calendar_id: config.calendar_id()?,
        timezone: config.timezone()?,
    };

    let store = fetch_store(&config, &range).await?;
    if store.is_empty() {
        println!("No exams to push");
        return Ok(());
    }

    let calendar = GoogleCalendar::new(access_token)?;
    println!(
        "Pushing {} exams to {}...",
        store.len(),
        GoogleCalendar::normalize_calendar_id(&options.calendar_id)
    );
    let report = CalendarReconciler::new(&calendar, options)
        .reconcile(&store)
        .await?;

    for outcome in &report.outcomes {
        let (mark, verb, event_id) = match &outcome.action {
            SyncAction::Inserted { event_id } => ("+", "added", event_id),
            SyncAction::Updated { event_id } => ("~", "updated", event_id),
            SyncAction::Unchanged { event_id } => ("=", "unchanged", event_id),
        };
        println!(
            "  {} {} {} ({}, {})",
            mark,
            config.format_date(outcome.exam.date),
            outcome.exam.subject,
            verb,
            event_id
        );
    }
    println!(
        "✓ {} added, {} updated, {} unchanged",
        report.inserted(),
        report.updated(),
        report.unchanged()
    );

    Ok(())
}

/// Logs in, fetches the window and returns the deduplicated, aliased exams.
async fn fetch_store(config: &Config, range: &RangeParams) -> Result<ExamStore> {
    let (from, to) = resolve_range(config, range)?;
    let school = config.school()?;
    let session = Session::new(school, config.credentials()?)?;

    println!("Logging in as {}...", session.username());
    session.login().await?;
    println!("✓ Logged in to {}", session.school().login_name);

    let exams = session.fetch_exams(from, to).await;
    session.logout();
    let exams = exams?;

    let mut store = ExamStore::new();
    store.merge(exams);
    store.translate_subjects(&config.aliases());
    tracing::info!(
        "{} exams between {} and {}",
        store.len(),
        config.format_date(from),
        config.format_date(to)
    );

    Ok(store)
}

fn resolve_range(config: &Config, range: &RangeParams) -> Result<(NaiveDate, NaiveDate)> {
    let (default_from, default_to) = SchoolYear::current().range()?;
    let from = match range.from.as_deref() {
        Some(value) => config.parse_date(value)?,
        None => default_from,
    };
    let to = match range.to.as_deref() {
        Some(value) => config.parse_date(value)?,
        None => default_to,
    };

    if from > to {
        return Err(anyhow!(
            "Start date {} is after end date {}",
            config.format_date(from),
            config.format_date(to)
        ));
    }
    Ok((from, to))
}
