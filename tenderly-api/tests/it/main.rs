//! Tenderly management API tests against a local stub server

use mockito::Server;
use tenderly_api::Client;

mod fork;

const USER: &str = "me";
const PROJECT: &str = "sandbox";
const ACCESS_KEY: &str = "secret";

/// Returns a client pointed at the stub server.
pub fn client_for(server: &Server) -> Client {
    init_tracing();
    Client::builder()
        .with_api_url(format!("{}/api/v1", server.url()))
        .unwrap()
        .with_user(USER)
        .with_project(PROJECT)
        .with_access_key(ACCESS_KEY)
        .build()
        .unwrap()
}

pub fn forks_path() -> String {
    format!("/api/v1/account/{USER}/project/{PROJECT}/fork")
}

#[track_caller]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
