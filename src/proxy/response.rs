//! Normalized upstream responses.

// std
use std::borrow::Cow;
// self
use crate::{
	_prelude::*,
	http::{HeaderMap, HttpResponse},
};

/// Decoded response body.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
	/// Body parsed as JSON.
	Json(Value),
	/// Body that is not valid JSON, kept verbatim (lossy UTF-8).
	Raw(String),
}
impl ResponseData {
	/// Decodes `body`; empty bodies yield `None`.
	pub fn decode(body: &[u8]) -> Option<Self> {
		if body.is_empty() {
			return None;
		}

		Some(match serde_json::from_slice(body) {
			Ok(value) => ResponseData::Json(value),
			Err(_) => ResponseData::Raw(String::from_utf8_lossy(body).into_owned()),
		})
	}

	/// Converts into a JSON value; raw text becomes a JSON string.
	pub fn into_json(self) -> Value {
		match self {
			ResponseData::Json(value) => value,
			ResponseData::Raw(text) => Value::String(text),
		}
	}

	/// Stringified body: the raw text, or the JSON re-encoded.
	pub fn to_text(&self) -> Cow<'_, str> {
		match self {
			ResponseData::Json(value) => Cow::Owned(value.to_string()),
			ResponseData::Raw(text) => Cow::Borrowed(text),
		}
	}
}

/// Upstream answer as returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProxyResponse {
	/// HTTP status code.
	pub status: u16,
	/// Lower-cased, trimmed header names mapped to their last value.
	pub headers: BTreeMap<String, String>,
	/// Decoded body; `None` when the body was empty.
	pub data: Option<ResponseData>,
}
impl ProxyResponse {
	/// Normalizes a transport response.
	pub fn from_http(response: &HttpResponse) -> Self {
		Self {
			status: response.status().as_u16(),
			headers: normalize_headers(response.headers()),
			data: ResponseData::decode(response.body()),
		}
	}

	/// Stringified body (empty when there is none).
	pub fn body_text(&self) -> Cow<'_, str> {
		self.data.as_ref().map(ResponseData::to_text).unwrap_or(Cow::Borrowed(""))
	}
}

fn normalize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
	let mut normalized = BTreeMap::new();

	for (name, value) in headers {
		normalized.insert(
			name.as_str().trim().to_ascii_lowercase(),
			String::from_utf8_lossy(value.as_bytes()).trim().to_owned(),
		);
	}

	normalized
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::{HeaderValue, StatusCode, header};

	fn http_response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() =
			StatusCode::from_u16(status).expect("Fixture status should be valid.");

		response
	}

	#[test]
	fn json_body_is_decoded() {
		let response = ProxyResponse::from_http(&http_response(200, r#"[{"id":1}]"#));

		assert_eq!(response.status, 200);
		assert_eq!(response.data, Some(ResponseData::Json(serde_json::json!([{ "id": 1 }]))));
	}

	#[test]
	fn non_json_body_is_kept_raw_and_empty_body_is_none() {
		let raw = ProxyResponse::from_http(&http_response(502, "Bad gateway"));
		let empty = ProxyResponse::from_http(&http_response(204, ""));

		assert_eq!(raw.data, Some(ResponseData::Raw("Bad gateway".into())));
		assert_eq!(raw.body_text(), "Bad gateway");
		assert_eq!(empty.data, None);
		assert_eq!(empty.body_text(), "");
	}

	#[test]
	fn duplicate_headers_keep_last_value() {
		let mut response = http_response(200, "");

		response.headers_mut().append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
		response.headers_mut().append(header::SET_COOKIE, HeaderValue::from_static(" b=2 "));
		response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

		let response = ProxyResponse::from_http(&response);

		assert_eq!(response.headers.get("set-cookie").map(String::as_str), Some("b=2"));
		assert_eq!(response.headers.get("content-type").map(String::as_str), Some("text/plain"));
	}

	#[test]
	fn response_data_serializes_untagged() {
		assert_eq!(
			serde_json::to_value(ResponseData::Raw("oops".into())).expect("Raw should serialize."),
			Value::from("oops"),
		);
		assert_eq!(
			serde_json::to_value(ResponseData::Json(serde_json::json!({ "a": 1 })))
				.expect("JSON should serialize."),
			serde_json::json!({ "a": 1 }),
		);
	}
}
