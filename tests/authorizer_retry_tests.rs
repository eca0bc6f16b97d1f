use agw_armauth::azure::{
    AuthContext, AuthStrategy, Authorizer, CredentialSource, get_authorizer_with_retry,
    select_authorizer,
};
use agw_armauth::config::RetryPolicy;
use agw_armauth::error::{ArmError, AuthError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    File,
    ClientCredentials {
        client_id: String,
        client_secret: String,
        tenant_id: String,
    },
    Environment,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Token,
    EmptyToken,
    Fail,
}

struct RecordingSource {
    calls: Mutex<Vec<Call>>,
    outcomes: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
}

impl RecordingSource {
    fn new(outcomes: impl IntoIterator<Item = Outcome>, fallback: Outcome) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            fallback,
        }
    }

    fn always_ok() -> Self {
        Self::new([], Outcome::Token)
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, call: Call, strategy: AuthStrategy) -> Result<Authorizer, AuthError> {
        self.calls.lock().unwrap().push(call);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        match outcome {
            Outcome::Token => Ok(Authorizer::new(strategy, "token", None)),
            Outcome::EmptyToken => Ok(Authorizer::new(strategy, "", None)),
            Outcome::Fail => Err(AuthError::UpstreamStatus(StatusCode::SERVICE_UNAVAILABLE)),
        }
    }
}

#[async_trait]
impl CredentialSource for RecordingSource {
    async fn authorizer_from_file(&self) -> Result<Authorizer, AuthError> {
        self.respond(Call::File, AuthStrategy::File)
    }

    async fn authorizer_from_client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
        tenant_id: &str,
    ) -> Result<Authorizer, AuthError> {
        self.respond(
            Call::ClientCredentials {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                tenant_id: tenant_id.to_string(),
            },
            AuthStrategy::ClientCredentials,
        )
    }

    async fn authorizer_from_environment(&self) -> Result<Authorizer, AuthError> {
        self.respond(Call::Environment, AuthStrategy::Environment)
    }
}

fn policy(max_auth_retry_count: usize) -> RetryPolicy {
    RetryPolicy::new(max_auth_retry_count, Duration::from_secs(10))
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

#[tokio::test]
async fn auth_file_wins_over_managed_identity_and_context() {
    let source = RecordingSource::always_ok();
    let ctx = AuthContext::new("a", "b", "c");

    let authorizer = select_authorizer(&source, "/etc/appgw/auth.json", true, Some(&ctx))
        .await
        .expect("authorizer");

    assert_eq!(authorizer.strategy(), AuthStrategy::File);
    assert_eq!(source.calls(), vec![Call::File]);
}

#[tokio::test]
async fn managed_identity_uses_environment_even_with_context() {
    let source = RecordingSource::always_ok();
    let ctx = AuthContext::new("a", "b", "c");

    select_authorizer(&source, "", true, Some(&ctx))
        .await
        .expect("authorizer");

    assert_eq!(source.calls(), vec![Call::Environment]);
}

#[tokio::test]
async fn context_without_managed_identity_uses_client_credentials() {
    let source = RecordingSource::always_ok();
    let ctx = AuthContext::new("a", "b", "c");

    select_authorizer(&source, "", false, Some(&ctx))
        .await
        .expect("authorizer");

    assert_eq!(
        source.calls(),
        vec![Call::ClientCredentials {
            client_id: "a".to_string(),
            client_secret: "b".to_string(),
            tenant_id: "c".to_string(),
        }]
    );
}

#[tokio::test]
async fn incomplete_context_is_passed_through_as_empty_values() {
    let source = RecordingSource::always_ok();
    let ctx = AuthContext {
        client_id: Some("a".to_string()),
        client_secret: None,
        tenant_id: Some("c".to_string()),
    };

    select_authorizer(&source, "", false, Some(&ctx))
        .await
        .expect("authorizer");

    assert_eq!(
        source.calls(),
        vec![Call::ClientCredentials {
            client_id: "a".to_string(),
            client_secret: String::new(),
            tenant_id: "c".to_string(),
        }]
    );
}

#[tokio::test]
async fn nothing_configured_uses_environment() {
    let source = RecordingSource::always_ok();

    select_authorizer(&source, "", false, None)
        .await
        .expect("authorizer");

    assert_eq!(source.calls(), vec![Call::Environment]);
}

#[tokio::test(start_paused = true)]
async fn returns_first_usable_authorizer_without_sleeping() {
    let source = RecordingSource::always_ok();
    let start = Instant::now();

    let authorizer = get_authorizer_with_retry(&source, "", true, None, policy(3).backoff())
        .await
        .expect("authorizer");

    assert_eq!(authorizer.strategy(), AuthStrategy::Environment);
    assert_eq!(source.calls().len(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn errors_and_empty_authorizers_are_retried_alike() {
    let source = RecordingSource::new([Outcome::Fail, Outcome::EmptyToken], Outcome::Token);
    let ctx = AuthContext::new("a", "b", "c");
    let start = Instant::now();

    let authorizer =
        get_authorizer_with_retry(&source, "", false, Some(&ctx), policy(5).backoff())
            .await
            .expect("authorizer after retries");

    assert!(!authorizer.is_empty());
    assert_eq!(source.calls().len(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn exhausting_the_budget_reports_failed_token() {
    let source = RecordingSource::new([], Outcome::Fail);

    let err = get_authorizer_with_retry(&source, "/auth.json", false, None, policy(2).backoff())
        .await
        .expect_err("budget exhausted");

    assert!(
        matches!(err, ArmError::AuthRetryExhausted { attempts: 3 }),
        "got {err:?}"
    );
    assert_eq!(source.calls(), vec![Call::File, Call::File, Call::File]);
    assert!(err.to_string().contains("failed to get authorization token"));
}

#[tokio::test(start_paused = true)]
async fn zero_budget_makes_a_single_attempt() {
    let source = RecordingSource::new([], Outcome::Fail);
    let start = Instant::now();

    let err = get_authorizer_with_retry(&source, "", true, None, policy(0).backoff())
        .await
        .expect_err("no retries allowed");

    assert!(
        matches!(err, ArmError::AuthRetryExhausted { attempts: 1 }),
        "got {err:?}"
    );
    assert_eq!(source.calls(), vec![Call::Environment]);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn selector_traces_the_chosen_strategy_once() {
    let ctx = AuthContext::new("a", "b", "c");
    let cases: [(&str, bool, Option<&AuthContext>, &str); 3] = [
        (
            "/etc/appgw/auth.json",
            false,
            None,
            "Creating authorizer from file referenced by environment variable",
        ),
        (
            "",
            false,
            Some(&ctx),
            "Creating authorizer using Cluster Service Principal",
        ),
        (
            "",
            true,
            Some(&ctx),
            "Creating authorizer from Azure Managed Service Identity",
        ),
    ];

    for (auth_location, use_managed_identity, auth_context, expected) in cases {
        let (logs, _guard) = capture_logs();
        let source = RecordingSource::always_ok();

        select_authorizer(&source, auth_location, use_managed_identity, auth_context)
            .await
            .expect("authorizer");

        let text = logs.text();
        assert_eq!(text.matches("Creating authorizer").count(), 1, "got {text}");
        assert!(text.contains(expected), "got {text}");
        assert!(text.contains("DEBUG"), "got {text}");
    }
}
