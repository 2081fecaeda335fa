//! Lifecycle of the self-hosted static file server: serve, miss, stop.

use camino::Utf8PathBuf;

use vizcheck::server::start_static_server;

fn stage_site() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    std::fs::write(
        root.join("vector-similarity.html"),
        "<html><body><h1>Vector Similarity Analysis</h1></body></html>",
    )
    .unwrap();
    (dir, root)
}

#[tokio::test]
async fn serves_files_and_answers_not_found_for_misses() {
    let (_guard, root) = stage_site();
    let server = start_static_server(&root, 0).await.unwrap();
    let base_url = server.base_url();

    let response = reqwest::get(format!("{base_url}/vector-similarity.html"))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Vector Similarity Analysis"));

    let missing = reqwest::get(format!("{base_url}/not-there.html"))
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    server.stop().await;
}

#[tokio::test]
async fn stop_tears_the_listener_down() {
    let (_guard, root) = stage_site();
    let server = start_static_server(&root, 0).await.unwrap();
    let base_url = server.base_url();

    assert!(
        reqwest::get(format!("{base_url}/vector-similarity.html"))
            .await
            .is_ok()
    );

    server.stop().await;

    let after = reqwest::get(format!("{base_url}/vector-similarity.html")).await;
    assert!(after.is_err(), "server should refuse connections once stopped");
}

#[tokio::test]
async fn missing_directory_fails_fast() {
    let err = start_static_server(Utf8PathBuf::from("/no/such/tree").as_path(), 0)
        .await
        .err()
        .expect("startup should fail");
    assert!(err.to_string().contains("static directory not found"));
}
