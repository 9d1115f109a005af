// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{Event, Subscriber, field::Field};
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        self, FmtContext, FormatEvent, FormatFields, FormattedFields,
        format::{FmtSpan, JsonFields, Writer},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
};

use crate::cfg::enums::{LogOutput, RotationFrequency};

#[derive(Debug, Deserialize, Clone)]
struct LoggerFile {
    logger: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
struct LogConfig {
    level: String,
    output: LogOutput,
    #[serde(default)]
    is_show_line: bool,
    #[serde(default)]
    is_show_module_path: bool,
    #[serde(default)]
    is_show_target: bool,
    file: Option<LogFileConfig>,
}

#[derive(Debug, Deserialize, Clone)]
struct LogFileConfig {
    path: String,
    #[serde(default)]
    rotation_frequency: RotationFrequency,
}

/// One JSON line per event.
#[derive(Serialize)]
struct LogLine {
    timestamp: String,
    level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    module_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    fields: Map<String, Value>,
}

struct JsonLineFormat {
    config: Arc<LogConfig>,
}

impl<S, N> FormatEvent<S, N> for JsonLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);
        let mut fields = visitor.fields;

        // Span fields (device name, lba, ...) are flattened into the event.
        if let Some(scope) = ctx.event_scope() {
            let mut spans = Vec::new();
            for span in scope.from_root() {
                spans.push(span.name().to_string());
                if let Some(ext) = span.extensions().get::<FormattedFields<JsonFields>>() {
                    let parsed: Map<String, Value> =
                        serde_json::from_str(&ext.fields).unwrap_or_default();
                    fields.extend(parsed);
                }
            }
            fields.insert("spans".to_string(), json!(spans));
        }

        let meta = event.metadata();
        let cfg = &self.config;
        let line = LogLine {
            timestamp: chrono::Local::now().to_rfc3339(),
            level: meta.level().to_string(),
            target: cfg.is_show_target.then(|| meta.target().to_string()),
            module_path: cfg
                .is_show_module_path
                .then(|| meta.module_path().unwrap_or_default().to_string()),
            line: if cfg.is_show_line { meta.line() } else { None },
            fields,
        };

        writeln!(
            writer,
            "{}",
            serde_json::to_string(&line).map_err(|_| std::fmt::Error)?
        )
    }
}

#[derive(Default)]
struct FieldCollector {
    fields: Map<String, Value>,
}

impl tracing::field::Visit for FieldCollector {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), json!(format!("{value:?}")));
    }
}

fn make_writer(cfg: &LogConfig) -> Result<(NonBlocking, WorkerGuard)> {
    Ok(match cfg.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File => {
            let file = cfg
                .file
                .as_ref()
                .context("logger.output is `file` but logger.file is missing")?;
            let path = Path::new(&file.path);
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let Some(name) = path.file_name() else {
                bail!("logger.file.path has no file name: {}", file.path);
            };
            let rotation = match file.rotation_frequency {
                RotationFrequency::Minutely => Rotation::MINUTELY,
                RotationFrequency::Hourly => Rotation::HOURLY,
                RotationFrequency::Daily => Rotation::DAILY,
                RotationFrequency::Never => Rotation::NEVER,
            };
            tracing_appender::non_blocking(RollingFileAppender::new(rotation, dir, name))
        },
    })
}

/// Install the global JSON subscriber described by the YAML file at
/// `config_path`.
///
/// Keep the returned guard alive; dropping it flushes and stops the writer.
pub fn init_logger(config_path: &str) -> Result<WorkerGuard> {
    let raw = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read logger config {config_path}"))?;
    let parsed: LoggerFile = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse logger config {config_path}"))?;
    let config = Arc::new(parsed.logger);

    let (writer, guard) = make_writer(&config)?;

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .json()
        .event_format(JsonLineFormat {
            config: Arc::clone(&config),
        })
        .fmt_fields(JsonFields::default());

    let filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("invalid log level {:?}", config.level))?;

    let subscriber = tracing_subscriber::registry().with(filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("a global tracing subscriber is already installed")?;

    Ok(guard)
}
