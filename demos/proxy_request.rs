//! Demonstrates the inbound service against a mocked work-order API: gateway token, user login,
//! and a listing call whose confidential entries are filtered out.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use workorder_bff::{
	config::BffSettings,
	service::{BffService, InboundRequest},
	store::{MemorySession, SessionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-gateway\",\"expires_in\":3600}");
		})
		.await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/ao-produkt/v1/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-api\",\"expires_in\":1800}");
		})
		.await;
	let listing_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/ao-produkt/v1/arbetsorder").header("x-auth-token", "demo-api");
			then.status(200).header("content-type", "application/json").body(
				"[{\"id\":1,\"externtNr\":\"CONFIDENTIAL\"},{\"id\":2,\"externtNr\":\"A-17\"}]",
			);
		})
		.await;
	let settings = BffSettings {
		base_url: server.base_url(),
		consumer_key: "demo-key".into(),
		consumer_secret: "demo-secret".into(),
		username: "demo-user".into(),
		password: "demo-password".into(),
		..Default::default()
	};
	let service = BffService::with_reqwest(settings)?;
	let session: Arc<dyn SessionStore> = Arc::new(MemorySession::default());

	for _ in 0..2 {
		let envelope = service
			.handle(
				session.clone(),
				InboundRequest::new("/ao-produkt/v1/arbetsorder").user("demo-user"),
			)
			.await;

		println!("{}", serde_json::to_string_pretty(&envelope)?);
	}

	token_mock.assert_calls_async(1).await;
	login_mock.assert_calls_async(1).await;
	listing_mock.assert_calls_async(2).await;

	Ok(())
}
