//! Helpers shared by the unit tests.

use axum::Router;

/// Serves `app` on an ephemeral loopback port and returns its base URL.
pub(crate) async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });
    format!("http://{addr}")
}

/// A client for talking to [spawn_server] instances.
pub(crate) fn client() -> reqwest::Client {
    crate::config::http_client(std::time::Duration::from_secs(5)).expect("build test client")
}
