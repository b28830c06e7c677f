use crate::output::{print_json, print_table};
use anyhow::Context;
use dutysync_core::config::{parse_date_arg, Config, Credentials};
use dutysync_core::engine::{plan, DutySource};
use dutysync_core::notion::NotionSource;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct PlanRow {
    id: String,
    title: String,
    state: String,
    actions: Vec<String>,
}

/// Dry run: fetch the roster and show the transition each record would get.
/// Sends nothing, writes nothing.
pub fn run(config_path: &Path, date: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(config_path).context("failed to load config")?;
    let credentials = Credentials::from_env()?;

    let today = match date {
        Some(value) => parse_date_arg(value)?,
        None => config.today()?,
    };

    let database_id = credentials.database_id_or(&config.notion.database_id);
    let source = NotionSource::new(credentials.notion_token, database_id, &config.notion.api_base)?;
    let records = source.list_records()?;

    let rows: Vec<PlanRow> = records
        .iter()
        .map(|record| PlanRow {
            id: record.id.clone(),
            title: record.title.clone(),
            state: record.state(today).to_string(),
            actions: plan(record, today)
                .iter()
                .map(|a| a.to_string())
                .collect(),
        })
        .collect();

    if json {
        let value = serde_json::json!({
            "date": today.to_string(),
            "records": rows,
        });
        print_json(&value)?;
        return Ok(());
    }

    println!("Plan for {today} ({} record(s)):", rows.len());
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.id.clone(),
                row.title.clone(),
                row.state.clone(),
                if row.actions.is_empty() {
                    "-".to_string()
                } else {
                    row.actions.join(", ")
                },
            ]
        })
        .collect();
    print_table(&["ID", "DUTY", "STATE", "ACTIONS"], table);
    Ok(())
}
