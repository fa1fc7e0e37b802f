//! Inbound proxy request model: path, method, and the tagged body variants.

// self
use crate::{_prelude::*, http::Method};

/// Methods the proxy forwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// `GET`; never carries a body.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `DELETE`; never carries a body.
	Delete,
}
impl HttpMethod {
	/// Returns the canonical upper-case method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Delete => "DELETE",
		}
	}

	/// Returns `true` for methods whose body is forwarded.
	pub const fn accepts_body(self) -> bool {
		matches!(self, HttpMethod::Post | HttpMethod::Put)
	}

	pub(crate) fn to_http(self) -> Method {
		match self {
			HttpMethod::Get => Method::GET,
			HttpMethod::Post => Method::POST,
			HttpMethod::Put => Method::PUT,
			HttpMethod::Delete => Method::DELETE,
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for HttpMethod {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"GET" => Ok(HttpMethod::Get),
			"POST" => Ok(HttpMethod::Post),
			"PUT" => Ok(HttpMethod::Put),
			"DELETE" => Ok(HttpMethod::Delete),
			_ => Err(Error::UnsupportedMethod { method: s.to_owned() }),
		}
	}
}

/// Uploaded file carried in a multipart body.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
	/// File name announced to the upstream.
	pub file_name: String,
	/// MIME type, when known.
	pub mime_type: Option<String>,
	/// File content.
	pub bytes: Vec<u8>,
}
impl Debug for FilePart {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FilePart")
			.field("file_name", &self.file_name)
			.field("mime_type", &self.mime_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}

/// Content of a single multipart field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartContent {
	/// Plain text field.
	Text(String),
	/// File upload.
	File(FilePart),
}

/// Named multipart field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartPart {
	/// Form field name.
	pub name: String,
	/// Field content.
	pub content: PartContent,
}
impl MultipartPart {
	/// Builds a text field.
	pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), content: PartContent::Text(value.into()) }
	}

	/// Builds a file field.
	pub fn file(
		name: impl Into<String>,
		file_name: impl Into<String>,
		mime_type: Option<String>,
		bytes: Vec<u8>,
	) -> Self {
		Self {
			name: name.into(),
			content: PartContent::File(FilePart { file_name: file_name.into(), mime_type, bytes }),
		}
	}
}

/// Request body; JSON and multipart payloads are dispatched explicitly.
#[derive(Clone, Debug, PartialEq)]
pub enum ProxyBody {
	/// JSON document sent with `Content-Type: application/json`.
	Json(Value),
	/// Multipart form; the transport picks the boundary.
	Multipart(Vec<MultipartPart>),
}

/// One call to forward upstream.
#[derive(Clone, Debug, PartialEq)]
pub struct ProxyRequest {
	/// Upstream path appended to the base URL; never empty.
	pub path: String,
	/// Method to forward.
	pub method: HttpMethod,
	/// Optional body, only forwarded for POST and PUT.
	pub body: Option<ProxyBody>,
}
impl ProxyRequest {
	/// Creates a request; an empty or blank path is rejected with [`Error::MissingPath`].
	pub fn new(path: impl Into<String>, method: HttpMethod) -> Result<Self> {
		let path = path.into();

		if path.trim().is_empty() {
			return Err(Error::MissingPath);
		}

		Ok(Self { path, method, body: None })
	}

	/// Parses `method` and creates a request; unknown methods fail before any network call.
	pub fn parse(path: impl Into<String>, method: &str) -> Result<Self> {
		let path = path.into();

		if path.trim().is_empty() {
			return Err(Error::MissingPath);
		}

		Self::new(path, method.parse()?)
	}

	/// Attaches a body.
	pub fn with_body(mut self, body: ProxyBody) -> Self {
		self.body = Some(body);

		self
	}

	/// Body that will actually be sent: present only for POST/PUT, and never a JSON `null`.
	pub fn effective_body(&self) -> Option<&ProxyBody> {
		if !self.method.accepts_body() {
			return None;
		}

		match self.body.as_ref()? {
			ProxyBody::Json(Value::Null) => None,
			body => Some(body),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn methods_parse_case_insensitively() {
		assert_eq!("get".parse::<HttpMethod>().expect("get should parse."), HttpMethod::Get);
		assert_eq!(" PUT ".parse::<HttpMethod>().expect("PUT should parse."), HttpMethod::Put);

		let err = "PATCH".parse::<HttpMethod>().expect_err("PATCH is not forwarded.");

		assert!(matches!(err, Error::UnsupportedMethod { ref method } if method == "PATCH"));
	}

	#[test]
	fn blank_path_is_rejected_before_method() {
		assert!(matches!(ProxyRequest::parse("", "PATCH"), Err(Error::MissingPath)));
		assert!(matches!(ProxyRequest::new("  ", HttpMethod::Get), Err(Error::MissingPath)));
	}

	#[test]
	fn effective_body_only_for_post_and_put() {
		let body = ProxyBody::Json(serde_json::json!({ "a": 1 }));
		let get = ProxyRequest::new("/x", HttpMethod::Get)
			.expect("Path should be accepted.")
			.with_body(body.clone());
		let post = ProxyRequest::new("/x", HttpMethod::Post)
			.expect("Path should be accepted.")
			.with_body(body.clone());
		let null = ProxyRequest::new("/x", HttpMethod::Put)
			.expect("Path should be accepted.")
			.with_body(ProxyBody::Json(Value::Null));

		assert_eq!(get.effective_body(), None);
		assert_eq!(post.effective_body(), Some(&body));
		assert_eq!(null.effective_body(), None);
	}

	#[test]
	fn file_part_debug_omits_content() {
		let part =
			MultipartPart::file("file", "photo.jpg", Some("image/jpeg".into()), vec![1, 2, 3]);
		let rendered = format!("{part:?}");

		assert!(rendered.contains("photo.jpg"));
		assert!(rendered.contains("len: 3"));
		assert!(!rendered.contains("[1, 2, 3]"));
	}
}
