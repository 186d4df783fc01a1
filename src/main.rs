/* stilgar-firebase - Rudderstack events to Firebase Analytics calls
 * Copyright (C) 2023 Withings
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>. */

use stilgar_firebase::config;
use stilgar_firebase::logging;
use stilgar_firebase::destinations::forward_event;
use stilgar_firebase::destinations::firebase::Firebase;
use stilgar_firebase::destinations::firebase::sink::JsonLinesSink;
use stilgar_firebase::events::any::EventOrBatch;
use stilgar_firebase::events::rejections::explain_rejection;

use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use tokio;
use tokio::io::AsyncReadExt;
use log;

/// Translates Rudderstack payloads into Firebase Analytics calls, one JSON line per call on stdout
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (defaults to STILGAR_FIREBASE_CONFIG, then usual locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Only explain why the payload would be rejected
    #[arg(long)]
    check: bool,
    /// Payload file, a single event or a batch (stdin if absent)
    input: Option<PathBuf>,
}

/// Reads the whole payload from a file or stdin
async fn read_payload(input: Option<&PathBuf>) -> Result<String, String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path).await
            .map_err(|e| format!("{}: {}", path.display(), e)),
        None => {
            let mut payload = String::new();
            tokio::io::stdin().read_to_string(&mut payload).await
                .map_err(|e| format!("stdin: {}", e))?;
            Ok(payload)
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    /* Locate and parse the configuration file, see config.rs */
    let configuration = match config::get_configuration(args.config.as_deref()) {
        Ok(c) => c.unwrap_or_default(),
        Err(e) => {
            eprintln!("failed to process configuration file: {}", e);
            std::process::exit(1);
        }
    };

    let _logger = match logging::init_logger(&configuration.logging) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let payload = match read_payload(args.input.as_ref()).await {
        Ok(p) => p,
        Err(e) => {
            log::error!("failed to read payload: {}", e);
            std::process::exit(1);
        }
    };

    /* Troubleshooting mode: explain and leave */
    if args.check {
        let explanations = explain_rejection(&payload);
        match explanations.is_empty() {
            true => println!("No errors."),
            false => {
                println!("{}", explanations.join("\n"));
                std::process::exit(1);
            }
        }
        return;
    }

    let event_or_batch: EventOrBatch = match serde_json::from_str(&payload) {
        Ok(e) => e,
        Err(e) => {
            log::error!("rejected payload: {}", e);
            for explanation in explain_rejection(&payload) {
                log::info!("{}", explanation);
            }
            std::process::exit(1);
        }
    };

    log::debug!("firebase settings:\n{}", configuration.settings_summary());
    let sink = Arc::new(JsonLinesSink::new(std::io::stdout()));
    let firebase = match Firebase::new(&configuration.firebase, sink) {
        Ok(f) => f,
        Err(e) => {
            log::error!("destination error: {}", e);
            std::process::exit(1);
        }
    };

    let mut failures = 0;
    for event in event_or_batch.into_events() {
        if forward_event(firebase.as_ref(), &event).await.is_err() {
            failures += 1;
        }
    }

    if failures > 0 {
        log::error!("{} event(s) could not be forwarded", failures);
        std::process::exit(1);
    }
}
