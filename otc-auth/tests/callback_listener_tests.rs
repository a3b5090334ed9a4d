//! Callback listener behavior: outcome delivery, replay handling, timeout,
//! and the status-polling channel.

use otc_auth::error::AuthError;
use otc_auth::{CallbackListener, StatusReporter};
use std::time::{Duration, Instant};

/// Start a listener on an OS-assigned port and return it with its base URL.
async fn started_listener() -> (CallbackListener, String) {
    let mut listener = CallbackListener::new(0);
    listener.start().await.expect("listener should bind port 0");
    let addr = listener.local_addr().expect("bound address");
    (listener, format!("http://{addr}"))
}

#[tokio::test]
async fn callback_with_code_unblocks_the_waiter() {
    let (mut listener, base) = started_listener().await;

    let resp = reqwest::get(format!("{base}/oidc/auth?code=ABC&state=XYZ"))
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let page = resp.text().await.unwrap();
    assert!(page.contains("terminal"));

    let auth_code = listener
        .wait_for_code(Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(auth_code.code, "ABC");
    assert_eq!(auth_code.state, "XYZ");

    listener.close().await;
}

#[tokio::test]
async fn oauth_error_is_surfaced_with_its_code() {
    let (mut listener, base) = started_listener().await;

    let resp = reqwest::get(format!(
        "{base}/oidc/auth?error=access_denied&error_description=user+cancelled"
    ))
    .await
    .unwrap();
    assert!(resp.status().is_success());

    match listener.wait_for_code(Duration::from_secs(1)).await {
        Err(AuthError::Oauth { error, description }) => {
            assert_eq!(error, "access_denied");
            assert_eq!(description, "user cancelled");
        }
        other => panic!("expected OAuth error, got {other:?}"),
    }

    listener.close().await;
}

#[tokio::test]
async fn missing_code_is_a_distinct_error() {
    let (mut listener, base) = started_listener().await;

    reqwest::get(format!("{base}/oidc/auth?state=XYZ"))
        .await
        .unwrap();

    match listener.wait_for_code(Duration::from_secs(1)).await {
        Err(AuthError::Oauth { error, .. }) => assert_eq!(error, "missing_code"),
        other => panic!("expected missing_code error, got {other:?}"),
    }

    listener.close().await;
}

#[tokio::test]
async fn replayed_callback_is_dropped_not_queued() {
    let (mut listener, base) = started_listener().await;
    let url = format!("{base}/oidc/auth?code=ABC&state=XYZ");

    // A reloaded browser tab re-sends the same redirect. Both requests must
    // get a page back; only the first delivers.
    assert!(reqwest::get(&url).await.unwrap().status().is_success());
    assert!(reqwest::get(&url).await.unwrap().status().is_success());

    let auth_code = listener
        .wait_for_code(Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(auth_code.code, "ABC");

    listener.close().await;
}

#[tokio::test]
async fn wait_times_out_after_roughly_the_given_duration() {
    let (mut listener, _base) = started_listener().await;

    let start = Instant::now();
    let result = listener.wait_for_code(Duration::from_millis(100)).await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(AuthError::CallbackTimeout)));
    assert!(elapsed >= Duration::from_millis(90), "returned too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "returned too late: {elapsed:?}");

    listener.close().await;
}

#[tokio::test]
async fn late_callback_unblocks_waiter_when_it_arrives() {
    let (mut listener, base) = started_listener().await;

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = reqwest::get(format!("{base}/oidc/auth?code=LATE&state=S")).await;
    });

    let start = Instant::now();
    let auth_code = listener
        .wait_for_code(Duration::from_secs(5))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(auth_code.code, "LATE");
    assert!(elapsed >= Duration::from_millis(150));
    assert!(elapsed < Duration::from_secs(5));

    listener.close().await;
}

#[tokio::test]
async fn status_endpoint_reports_pushed_updates() {
    let (mut listener, base) = started_listener().await;

    let body: serde_json::Value = reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "");

    // The StatusReporter seam is how the token chain pushes progress.
    listener.report("pending", "validating organization access");

    let body: serde_json::Value = reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["message"], "validating organization access");

    listener.close().await;
}

#[tokio::test]
async fn close_page_is_served() {
    let (mut listener, base) = started_listener().await;

    let page = reqwest::get(format!("{base}/close"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Authentication complete"));

    listener.close().await;
}

#[tokio::test]
async fn close_is_idempotent_and_safe_without_start() {
    let mut never_started = CallbackListener::new(0);
    never_started.close().await;
    never_started.close().await;

    let (mut listener, base) = started_listener().await;
    listener.close().await;
    listener.close().await;

    // The port is released after close.
    assert!(reqwest::get(format!("{base}/status")).await.is_err());
}
