//! Candidate-URL fallback, exercised against a real local HTTP server.

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use vizcheck::error::HarnessError;
use vizcheck::navigate::probe_candidates;

async fn serve_single_page() -> (String, oneshot::Sender<()>) {
    let router = Router::new()
        .route("/present.html", get(|| async { "<html>ok</html>" }))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") });

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    (base_url, shutdown_tx)
}

#[tokio::test]
async fn second_candidate_wins_when_the_first_is_not_found() {
    let (base_url, _shutdown) = serve_single_page().await;

    let candidates = vec![
        format!("{base_url}/missing.html"),
        format!("{base_url}/present.html"),
    ];
    let result = probe_candidates(&candidates).await.unwrap();

    assert_eq!(result.final_url, candidates[1]);
    assert_eq!(result.status_code, 200);
}

#[tokio::test]
async fn first_reachable_candidate_short_circuits() {
    let (base_url, _shutdown) = serve_single_page().await;

    let candidates = vec![
        format!("{base_url}/present.html"),
        format!("{base_url}/missing.html"),
    ];
    let result = probe_candidates(&candidates).await.unwrap();

    assert_eq!(result.final_url, candidates[0]);
}

#[tokio::test]
async fn exhausted_candidates_report_every_attempt() {
    let (base_url, _shutdown) = serve_single_page().await;

    let candidates = vec![
        format!("{base_url}/nope.html"),
        format!("{base_url}/also-nope.html"),
    ];
    let err = probe_candidates(&candidates).await.unwrap_err();

    let HarnessError::Navigation { attempts } = &err else {
        panic!("expected a navigation error, got {err}");
    };
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|attempt| attempt.status == Some(404)));

    let rendered = err.to_string();
    assert!(rendered.contains("nope.html"));
    assert!(rendered.contains("also-nope.html"));
}

#[tokio::test]
async fn unreachable_candidates_are_recorded_as_errors() {
    // A listener that is bound then dropped gives us a port nothing answers
    // on.
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let dead_url = format!("http://{}/page.html", listener.local_addr().unwrap());
    drop(listener);

    let err = probe_candidates(&[dead_url]).await.unwrap_err();
    let HarnessError::Navigation { attempts } = err else {
        panic!("expected a navigation error");
    };
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, None);
    assert!(attempts[0].error.is_some());
}
