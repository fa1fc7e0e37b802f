//! Append-only audit log of proxied exchanges.
//!
//! Each enabled logger appends pretty-printed JSON entries to `api_log_<YYYY-MM-DD>.log` in its
//! directory (UTC date). Credentials are redacted at any depth and uploaded files are reduced to
//! their name and MIME type. Writing never fails a request: I/O errors only emit a warning.

// std
use std::{
	env,
	fs::{self, OpenOptions},
	io::{self, Write},
	path::PathBuf,
};
// crates.io
use time::{format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::{
	_prelude::*,
	config::BffSettings,
	obs,
	proxy::{PartContent, ProxyBody, ProxyRequest, ProxyResponse, ResponseData},
};

/// Replacement written instead of a sensitive value.
pub const REDACTED: &str = "***REDACTED***";
/// Keys whose values never reach the log.
pub const SENSITIVE_KEYS: [&str; 4] =
	["password", "access_token", "refresh_token", "consumer_secret"];

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const EXCHANGE_RULE: char = '-';
const ERROR_RULE: char = '=';
const RULE_WIDTH: usize = 80;
const ANONYMOUS_USER: &str = "guest";

#[derive(Serialize)]
struct ExchangeEntry<'a> {
	timestamp: String,
	user: &'a str,
	method: &'a str,
	path: &'a str,
	request: Value,
	response_status: u16,
	response_data: Value,
}

#[derive(Serialize)]
struct ErrorEntry<'a> {
	timestamp: String,
	#[serde(rename = "type")]
	kind: &'static str,
	user: &'a str,
	message: &'a str,
}

/// File-backed audit logger; a disabled logger accepts every call and writes nothing.
#[derive(Debug, Default)]
pub struct AuditLogger {
	directory: Option<PathBuf>,
	write_guard: Mutex<()>,
}
impl AuditLogger {
	/// Logger that discards every entry.
	pub fn disabled() -> Self {
		Self::default()
	}

	/// Logger writing into `directory`, created on first write when missing.
	pub fn new(directory: impl Into<PathBuf>) -> Self {
		Self { directory: Some(directory.into()), write_guard: Mutex::new(()) }
	}

	/// Builds the logger described by `settings`; the OS temp directory is the default target.
	pub fn from_settings(settings: &BffSettings) -> Self {
		if !settings.log_enabled {
			return Self::disabled();
		}

		Self::new(settings.log_directory.clone().unwrap_or_else(env::temp_dir))
	}

	/// Returns `true` when entries are written.
	pub fn is_enabled(&self) -> bool {
		self.directory.is_some()
	}

	/// File receiving today's entries, if enabled.
	pub fn current_log_file(&self) -> Option<PathBuf> {
		let directory = self.directory.as_ref()?;
		let date = OffsetDateTime::now_utc().format(DATE_FORMAT).ok()?;

		Some(directory.join(format!("api_log_{date}.log")))
	}

	/// Records one forwarded request and the upstream answer.
	pub fn log_exchange(
		&self,
		user: Option<&str>,
		request: &ProxyRequest,
		response: &ProxyResponse,
	) {
		if !self.is_enabled() {
			return;
		}

		let entry = ExchangeEntry {
			timestamp: timestamp(),
			user: user.unwrap_or(ANONYMOUS_USER),
			method: request.method.as_str(),
			path: &request.path,
			request: summarize_body(request.effective_body()),
			response_status: response.status,
			response_data: summarize_response(response.data.as_ref()),
		};

		self.append(EXCHANGE_RULE, &entry);
	}

	/// Records a request that failed before or instead of an upstream answer.
	pub fn log_error(&self, user: Option<&str>, message: &str) {
		if !self.is_enabled() {
			return;
		}

		let entry = ErrorEntry {
			timestamp: timestamp(),
			kind: "ERROR",
			user: user.unwrap_or(ANONYMOUS_USER),
			message,
		};

		self.append(ERROR_RULE, &entry);
	}

	fn append<T>(&self, rule: char, entry: &T)
	where
		T: Serialize,
	{
		if let Err(e) = self.try_append(rule, entry) {
			obs::audit_write_failed_event(&e);
		}
	}

	fn try_append<T>(&self, rule: char, entry: &T) -> io::Result<()>
	where
		T: Serialize,
	{
		let (Some(directory), Some(path)) = (self.directory.as_ref(), self.current_log_file())
		else {
			return Ok(());
		};
		let body = serde_json::to_string_pretty(entry).map_err(io::Error::other)?;
		let mut line = String::with_capacity(RULE_WIDTH + body.len() + 2);

		line.extend(std::iter::repeat_n(rule, RULE_WIDTH));
		line.push('\n');
		line.push_str(&body);
		line.push('\n');

		let _lock = self.write_guard.lock();

		fs::create_dir_all(directory)?;

		let mut file = OpenOptions::new().create(true).append(true).open(path)?;

		file.write_all(line.as_bytes())
	}
}

/// Replaces sensitive values anywhere inside `value`.
pub fn redact(value: &Value) -> Value {
	match value {
		Value::Object(map) => Value::Object(
			map.iter()
				.map(|(key, value)| {
					let value = if SENSITIVE_KEYS.contains(&key.as_str()) {
						Value::from(REDACTED)
					} else {
						redact(value)
					};

					(key.clone(), value)
				})
				.collect(),
		),
		Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
		other => other.clone(),
	}
}

/// Loggable view of a request body: redacted JSON, or multipart fields with files summarized.
pub fn summarize_body(body: Option<&ProxyBody>) -> Value {
	match body {
		None => Value::Null,
		Some(ProxyBody::Json(value)) => redact(value),
		Some(ProxyBody::Multipart(parts)) => {
			let mut fields = serde_json::Map::new();

			for part in parts {
				let value = match &part.content {
					PartContent::Text(text) => Value::from(text.as_str()),
					PartContent::File(file) => serde_json::json!({
						"type": "FILE_UPLOAD",
						"name": file.file_name,
						"mime": file.mime_type,
					}),
				};

				fields.insert(part.name.clone(), value);
			}

			redact(&Value::Object(fields))
		},
	}
}

fn summarize_response(data: Option<&ResponseData>) -> Value {
	match data {
		None => Value::Null,
		Some(ResponseData::Json(value)) => redact(value),
		Some(ResponseData::Raw(text)) => Value::from(text.as_str()),
	}
}

fn timestamp() -> String {
	OffsetDateTime::now_utc().format(TIMESTAMP_FORMAT).unwrap_or_default()
}
