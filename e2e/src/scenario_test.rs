use std::time::Duration;

use super::*;
use crate::config::Timeouts;
use crate::driver::Probe;
use crate::locator::Target;
use crate::testing::{APP_URL, Behavior, ScriptedApp};

fn test_config() -> E2eConfig {
    let mut config = E2eConfig::from_lookup(|key| match key {
        "BASE_URL" => Some(APP_URL.to_owned()),
        _ => None,
    });
    config.timeouts = Timeouts {
        element: Duration::from_millis(150),
        navigation: Duration::from_millis(150),
        login_response: Duration::from_millis(150),
        rejected_login_response: Duration::from_millis(150),
        reset: Duration::from_millis(150),
        poll: Duration::from_millis(5),
    };
    config
}

async fn run(scenario: Scenario, app: &ScriptedApp, config: &E2eConfig) -> Result<(), E2eError> {
    prepare(app, config).await?;
    scenario.run(app, config).await
}

#[test]
fn scenario_names_round_trip() {
    for scenario in Scenario::ALL {
        assert_eq!(scenario.name().parse::<Scenario>().unwrap(), scenario);
        assert_eq!(scenario.to_string(), scenario.name());
    }
    assert!(matches!("checkout".parse::<Scenario>(), Err(E2eError::Config(_))));
}

#[test]
fn rejection_alert_accepts_known_messages() {
    let pattern = rejection_alert();
    assert!(pattern.is_match("El mail ingresado no se encuentra registrado"));
    assert!(pattern.is_match("Credenciales incorrectas"));
    assert!(pattern.is_match("Ocurrió un ERROR inesperado"));
    assert!(!pattern.is_match("Bienvenido"));
}

#[tokio::test]
async fn prepare_clears_origin_and_opens_login() {
    let app = ScriptedApp::new(Behavior::default());
    app.set_storage("authToken", "stale");
    prepare(&app, &test_config()).await.unwrap();

    assert_eq!(app.cleared_origins(), vec![APP_URL.to_owned()]);
    assert_eq!(app.visits(), vec![format!("{APP_URL}/login")]);
    assert_eq!(app.local_storage_item("authToken").await.unwrap(), None);
}

#[tokio::test]
async fn login_logout_passes_with_test_hooks() {
    let app = ScriptedApp::new(Behavior::default());
    run(Scenario::LoginLogout, &app, &test_config()).await.unwrap();

    assert_eq!(app.typed(), ("eren@gmail.com".to_owned(), "123456".to_owned()));
    assert_eq!(app.clicks(), vec!["submit", "menu", "account", "logout"]);
}

#[tokio::test]
async fn login_logout_passes_with_text_fallbacks() {
    let app = ScriptedApp::new(Behavior {
        hooks: false,
        ..Behavior::default()
    });
    run(Scenario::LoginLogout, &app, &test_config()).await.unwrap();
    assert_eq!(app.clicks(), vec!["submit", "menu", "account", "logout"]);
}

#[tokio::test]
async fn login_logout_passes_with_submit_input() {
    let app = ScriptedApp::new(Behavior {
        submit_input: true,
        hooks: false,
        ..Behavior::default()
    });
    run(Scenario::LoginLogout, &app, &test_config()).await.unwrap();
    assert_eq!(app.clicks(), vec!["submit", "menu", "account", "logout"]);
}

#[tokio::test]
async fn login_logout_waits_for_token_to_clear() {
    let app = ScriptedApp::new(Behavior {
        logout_route: "/home",
        stale_token_reads: 2,
        ..Behavior::default()
    });
    run(Scenario::LoginLogout, &app, &test_config()).await.unwrap();
    assert_eq!(app.local_storage_item("authToken").await.unwrap(), None);
}

#[tokio::test]
async fn login_logout_accepts_public_home_after_logout() {
    let app = ScriptedApp::new(Behavior {
        logout_route: "/home",
        ..Behavior::default()
    });
    run(Scenario::LoginLogout, &app, &test_config()).await.unwrap();
}

#[tokio::test]
async fn tightened_logout_routes_reject_public_home() {
    let app = ScriptedApp::new(Behavior {
        logout_route: "/home",
        ..Behavior::default()
    });
    let mut config = test_config();
    config.logout_routes = vec!["/login".to_owned()];

    let err = run(Scenario::LoginLogout, &app, &config).await.unwrap_err();
    assert!(
        matches!(err, E2eError::Timeout { ref what, .. } if what == "URL to include one of /login"),
        "{err:?}"
    );
}

#[tokio::test]
async fn login_logout_fails_when_token_survives() {
    let app = ScriptedApp::new(Behavior {
        logout_clears_storage: false,
        ..Behavior::default()
    });
    let err = run(Scenario::LoginLogout, &app, &test_config()).await.unwrap_err();
    assert!(matches!(err, E2eError::CredentialLeft { ref key } if key == "authToken"), "{err:?}");
}

#[tokio::test]
async fn login_logout_checks_every_credential_key() {
    let app = ScriptedApp::new(Behavior::default());
    app.set_storage("accessToken", "tok");
    let err = assert_credentials_cleared(&app).await.unwrap_err();
    assert!(matches!(err, E2eError::CredentialLeft { ref key } if key == "accessToken"));

    app.set_storage("token", "tok");
    let err = assert_credentials_cleared(&app).await.unwrap_err();
    assert!(matches!(err, E2eError::CredentialLeft { ref key } if key == "token"));
}

#[tokio::test]
async fn login_logout_fails_when_menu_survives_logout() {
    let app = ScriptedApp::new(Behavior {
        logout_route: "/home",
        logout_hides_menu: false,
        ..Behavior::default()
    });
    let err = run(Scenario::LoginLogout, &app, &test_config()).await.unwrap_err();
    assert!(matches!(err, E2eError::StillReachable { .. }), "{err:?}");
}

#[tokio::test]
async fn login_logout_fails_on_server_error() {
    let app = ScriptedApp::new(Behavior {
        login_status: 500,
        ..Behavior::default()
    });
    let err = run(Scenario::LoginLogout, &app, &test_config()).await.unwrap_err();
    assert!(
        matches!(
            err,
            E2eError::UnexpectedStatus {
                what: "login",
                expected: 200,
                actual: 500
            }
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn login_logout_fails_on_duplicate_login_call() {
    let app = ScriptedApp::new(Behavior {
        duplicate_login_call: true,
        ..Behavior::default()
    });
    let err = run(Scenario::LoginLogout, &app, &test_config()).await.unwrap_err();
    assert!(matches!(err, E2eError::ExtraResponses { count: 1, .. }), "{err:?}");
}

#[tokio::test]
async fn login_logout_fails_with_wrong_credentials_configured() {
    let app = ScriptedApp::new(Behavior::default());
    let mut config = test_config();
    config.valid = LoginCredentials::new("eren@gmail.com", "not-the-password");

    let err = run(Scenario::LoginLogout, &app, &config).await.unwrap_err();
    assert!(matches!(err, E2eError::UnexpectedStatus { actual: 404, .. }), "{err:?}");
}

#[tokio::test]
async fn invalid_credentials_passes_without_dialog() {
    let app = ScriptedApp::new(Behavior::default());
    run(Scenario::InvalidCredentials, &app, &test_config()).await.unwrap();

    assert_eq!(app.typed(), ("wrong@gmail.com".to_owned(), "wrongpass".to_owned()));
    assert_eq!(app.clicks(), vec!["submit"]);
}

#[tokio::test]
async fn invalid_credentials_clicks_submit_input_not_heading() {
    let app = ScriptedApp::new(Behavior {
        submit_input: true,
        ..Behavior::default()
    });
    run(Scenario::InvalidCredentials, &app, &test_config()).await.unwrap();
    assert_eq!(app.clicks(), vec!["submit"]);
}

#[tokio::test]
async fn invalid_credentials_accepts_expected_alert() {
    let app = ScriptedApp::new(Behavior {
        rejection_dialog: Some("El mail ingresado no se encuentra registrado".to_owned()),
        ..Behavior::default()
    });
    run(Scenario::InvalidCredentials, &app, &test_config()).await.unwrap();
}

#[tokio::test]
async fn invalid_credentials_rejects_unexpected_alert() {
    let app = ScriptedApp::new(Behavior {
        rejection_dialog: Some("Bienvenido de nuevo".to_owned()),
        ..Behavior::default()
    });
    let err = run(Scenario::InvalidCredentials, &app, &test_config()).await.unwrap_err();
    assert!(
        matches!(err, E2eError::UnexpectedDialog { ref text, .. } if text == "Bienvenido de nuevo"),
        "{err:?}"
    );
}

#[tokio::test]
async fn invalid_credentials_requires_404() {
    let app = ScriptedApp::new(Behavior {
        rejected_status: 401,
        ..Behavior::default()
    });
    let err = run(Scenario::InvalidCredentials, &app, &test_config()).await.unwrap_err();
    assert!(
        matches!(
            err,
            E2eError::UnexpectedStatus {
                expected: 404,
                actual: 401,
                ..
            }
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn login_without_backend_answer_times_out() {
    type Senders = std::sync::Mutex<Vec<tokio::sync::mpsc::UnboundedSender<ObservedResponse>>>;
    struct Silent(ScriptedApp, Senders);

    #[async_trait::async_trait]
    impl PageDriver for Silent {
        async fn visit(&self, url: &str) -> Result<(), E2eError> {
            self.0.visit(url).await
        }
        async fn current_url(&self) -> Result<String, E2eError> {
            self.0.current_url().await
        }
        async fn probe(&self, target: &Target) -> Result<Probe, E2eError> {
            self.0.probe(target).await
        }
        async fn click(&self, target: &Target) -> Result<(), E2eError> {
            self.0.click(target).await
        }
        async fn fill(&self, target: &Target, text: &str) -> Result<(), E2eError> {
            self.0.fill(target, text).await
        }
        async fn local_storage_item(&self, key: &str) -> Result<Option<String>, E2eError> {
            self.0.local_storage_item(key).await
        }
        async fn clear_site_data(&self, origin: &str) -> Result<(), E2eError> {
            self.0.clear_site_data(origin).await
        }
        async fn observe_responses(
            &self,
            route: &RouteMatcher,
        ) -> Result<crate::driver::ResponseObserver, E2eError> {
            // Keep the sender alive but never feed it.
            let (tx, observer) = crate::driver::ResponseObserver::channel(route);
            self.1.lock().unwrap().push(tx);
            Ok(observer)
        }
        async fn observe_dialogs(&self) -> Result<crate::driver::DialogObserver, E2eError> {
            self.0.observe_dialogs().await
        }
    }

    let page = Silent(ScriptedApp::new(Behavior::default()), std::sync::Mutex::default());
    let config = test_config();
    prepare(&page, &config).await.unwrap();
    let err = Scenario::LoginLogout.run(&page, &config).await.unwrap_err();
    assert!(matches!(err, E2eError::Timeout { .. }), "{err:?}");
}
