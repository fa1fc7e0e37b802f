//! Cached credential blobs and token-endpoint response decoding.

// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::{AuthError, AuthStage},
	http::HttpResponse,
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Access token issued by either credential tier.
///
/// Tokens are never mutated in place; a refresh replaces the cached value wholesale.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
	/// Access token secret; callers must avoid logging it.
	pub access_token: Secret,
	/// Lifetime reported by the issuer, in seconds.
	#[serde(default)]
	pub expires_in: i64,
	/// Instant the token was obtained, truncated to whole Unix seconds so the cached copy
	/// compares equal to the value handed out on the first call.
	#[serde(with = "time::serde::timestamp")]
	pub obtained_at: OffsetDateTime,
	/// Remaining provider fields (`token_type`, `scope`, ...).
	#[serde(default)]
	pub raw: serde_json::Map<String, Value>,
}
impl Token {
	/// Creates a token without additional provider fields; `obtained_at` drops sub-seconds.
	pub fn new(
		access_token: impl Into<String>,
		expires_in: i64,
		obtained_at: OffsetDateTime,
	) -> Self {
		Self {
			access_token: Secret::new(access_token),
			expires_in,
			obtained_at: whole_seconds(obtained_at),
			raw: Default::default(),
		}
	}

	/// Instant at which the issuer stops honoring the token.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.obtained_at.saturating_add(Duration::seconds(self.expires_in))
	}

	/// Returns `true` once `now >= obtained_at + expires_in - buffer`.
	pub fn is_expired_at(&self, now: OffsetDateTime, buffer: Duration) -> bool {
		now >= self.expires_at().saturating_sub(buffer)
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("obtained_at", &self.obtained_at)
			.field("raw_fields", &self.raw.keys().collect::<Vec<_>>())
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(flatten)]
	raw: serde_json::Map<String, Value>,
}

/// Turns a token-endpoint response into a [`Token`] stamped with `obtained_at`.
///
/// Anything but HTTP 200 is [`AuthError::Rejected`]; a 200 whose body is not a JSON object is
/// [`AuthError::MalformedResponse`]; an object without `access_token` is
/// [`AuthError::MissingAccessToken`].
pub(crate) fn decode_token_response(
	stage: AuthStage,
	response: &HttpResponse,
	obtained_at: OffsetDateTime,
) -> Result<Token, AuthError> {
	let status = response.status().as_u16();

	if status != 200 {
		return Err(AuthError::Rejected { stage, status, body: body_preview(response.body()) });
	}

	let mut deserializer = serde_json::Deserializer::from_slice(response.body());
	let parsed: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| AuthError::MalformedResponse { stage, source })?;
	let access_token = parsed.access_token.ok_or(AuthError::MissingAccessToken { stage })?;

	Ok(Token {
		access_token: Secret::new(access_token),
		expires_in: parsed.expires_in.unwrap_or_default(),
		obtained_at: whole_seconds(obtained_at),
		raw: parsed.raw,
	})
}

fn whole_seconds(at: OffsetDateTime) -> OffsetDateTime {
	at - Duration::nanoseconds(i64::from(at.nanosecond()))
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.into_owned();
	}

	let mut buf = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}
