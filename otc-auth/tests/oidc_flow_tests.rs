//! Federated flow wiring: bind failures and CSRF state verification.

use otc_auth::error::AuthError;
use otc_auth::{AuthConfig, CallbackListener, OidcAuthenticator};
use std::time::Duration;

#[tokio::test]
async fn port_conflict_is_fatal_without_port_hunting() {
    let mut first = CallbackListener::new(0);
    first.start().await.unwrap();
    let taken = first.local_addr().unwrap().port();

    let mut second = CallbackListener::new(taken);
    let err = second.start().await.unwrap_err();
    assert!(matches!(err, AuthError::Bind { port, .. } if port == taken));

    first.close().await;
    second.close().await;
}

#[tokio::test]
async fn callback_with_forged_state_is_rejected() {
    // Fixed port: the flow owns listener startup, so the forged redirect
    // must know the address up front.
    const PORT: u16 = 19471;

    let cfg = AuthConfig {
        idp_url: "https://idp.example.com/realms/cloud".to_string(),
        idp_client_id: "otc-cli".to_string(),
        idp_provider_name: "corp-idp".to_string(),
        domain_name: "OTC-EU-DE-000000".to_string(),
        redirect_port: PORT,
        no_browser: true,
        ..AuthConfig::default()
    };

    let mut listener = CallbackListener::new(PORT);
    let authenticator = OidcAuthenticator::new(&cfg);

    let forged_redirect = async {
        // Give the flow time to bind and start waiting.
        tokio::time::sleep(Duration::from_millis(300)).await;
        reqwest::get(format!(
            "http://127.0.0.1:{PORT}/oidc/auth?code=STOLEN&state=forged"
        ))
        .await
    };

    let (result, redirect_resp) =
        tokio::join!(authenticator.authenticate(&mut listener), forged_redirect);

    // The browser side still gets a page; the flow refuses the code.
    assert!(redirect_resp.unwrap().status().is_success());
    assert!(matches!(result, Err(AuthError::StateMismatch)));

    listener.close().await;
}
