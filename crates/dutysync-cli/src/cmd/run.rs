use crate::output::print_json;
use anyhow::Context;
use dutysync_core::config::{parse_date_arg, Config, Credentials};
use dutysync_core::engine::Engine;
use dutysync_core::notion::NotionSource;
use dutysync_core::slack::SlackMessenger;
use std::path::Path;

pub fn run(config_path: &Path, date: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(config_path).context("failed to load config")?;
    let credentials = Credentials::from_env()?;

    let today = match date {
        Some(value) => parse_date_arg(value)?,
        None => config.today()?,
    };

    let database_id = credentials.database_id_or(&config.notion.database_id);
    let source = NotionSource::new(credentials.notion_token, database_id, &config.notion.api_base)?;
    let messenger = SlackMessenger::new(credentials.slack_token, &config.slack.api_base)?;

    let engine = Engine::new(&source, &messenger, config.mapping(), config.template());
    let summary = engine.run(today)?;

    if json {
        print_json(&summary)?;
    } else {
        println!("{summary}");
    }
    Ok(())
}
