// GutChat reference host
// Reads one JSON request per line on stdin and answers one JSON line on stdout.

use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use validator::Validate;

use gutchat_core::augment::{Augmenter, HttpAugmenter};
use gutchat_core::config::CoreConfig;
use gutchat_core::learning::LearnedEntry;
use gutchat_core::microbiome::AbundanceMatrix;
use gutchat_core::models::WearableSample;
use gutchat_core::{telemetry, AppError, Assistant, ChatRequest};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Command {
    Chat(ChatRequest),
    Feedback {
        text: String,
        #[serde(default)]
        custom_response: Option<String>,
        #[serde(default)]
        intent: Option<String>,
    },
    Stats,
    Profile {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Wearable(WearableSample),
    Snapshot,
    Restore {
        entries: Vec<LearnedEntry>,
    },
}

async fn handle(
    assistant: &Assistant,
    augmenter: Option<&dyn Augmenter>,
    command: Command,
) -> Result<Value, AppError> {
    let value = match command {
        Command::Chat(request) => {
            if let Some(profile) = &request.user_profile {
                profile.validate()?;
            }
            serde_json::to_value(assistant.reply(request, augmenter).await)?
        }
        Command::Feedback {
            text,
            custom_response,
            intent,
        } => {
            let learned =
                assistant.record_feedback(&text, custom_response.as_deref(), intent.as_deref());
            json!({ "learned": learned })
        }
        Command::Stats => serde_json::to_value(assistant.learning_stats())?,
        Command::Profile { header, rows } => {
            let matrix = AbundanceMatrix::from_records(header.as_slice(), rows.as_slice());
            let mut profile = serde_json::to_value(assistant.compute_profile(&matrix)?)?;
            profile["raw_data"] = serde_json::to_value(assistant.normalized_records(&matrix))?;
            profile
        }
        Command::Wearable(sample) => serde_json::to_value(assistant.assess_wearable(&sample))?,
        Command::Snapshot => serde_json::to_value(assistant.learning().snapshot())?,
        Command::Restore { entries } => {
            json!({ "restored": assistant.learning().restore(entries) })
        }
    };
    Ok(value)
}

async fn respond(assistant: &Assistant, augmenter: Option<&dyn Augmenter>, line: &str) -> Value {
    let outcome = match serde_json::from_str::<Command>(line) {
        Ok(command) => handle(assistant, augmenter, command).await,
        Err(e) => Err(AppError::from(e)),
    };

    match outcome {
        Ok(result) => json!({ "ok": true, "result": result }),
        Err(e) => {
            warn!("Request failed: {}", e);
            json!({ "ok": false, "error": e.to_string() })
        }
    }
}

async fn serve(assistant: &Assistant, augmenter: Option<&dyn Augmenter>) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = respond(assistant, augmenter, &line).await;
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CoreConfig::from_env().context("failed to load configuration")?;
    telemetry::init(&config.log_level, config.log_format)?;

    let assistant = Assistant::new(&config).context("failed to build assistant")?;
    let augmenter = if config.augment.is_enabled() {
        match HttpAugmenter::new(&config.augment) {
            Ok(augmenter) => Some(augmenter),
            Err(e) => {
                error!("Augmentation disabled: {}", e);
                None
            }
        }
    } else {
        None
    };
    let augmenter = augmenter.as_ref().map(|a| a as &dyn Augmenter);

    info!("GutChat ready, reading requests from stdin");
    serve(&assistant, augmenter).await?;
    info!("Input closed, shutting down");
    Ok(())
}
