mod common;

use async_trait::async_trait;
use common::{roster, video, CountingCatalog, RecordingAnalytics, StubSigner, T0_MS};
use serde_json::json;
use std::sync::Arc;
use vetlaunch_core::clock::ManualClock;
use vetlaunch_core::config::{ConfigError, CoreConfig};
use vetlaunch_core::model::directory::StaticDirectory;
use vetlaunch_core::model::resource::ResourceFamily;
use vetlaunch_core::runtime::{Collaborators, CoreRuntime};
use vetlaunch_core::service::notification_store::ConnectionStatus;
use vetlaunch_core::service::playback_tracker::PrefetchDecision;
use vetlaunch_core::service::tutor_service::TUTOR_APOLOGY;
use vetlaunch_core::spi::realtime::LoopbackTransport;
use vetlaunch_core::spi::tutor::{ChatMessage, TutorClient, TutorRequest, TutorResponse};

struct EchoTutor;

#[async_trait]
impl TutorClient for EchoTutor {
    async fn generate_response(&self, request: &TutorRequest) -> TutorResponse {
        match request.messages.last() {
            Some(message) if message.content == "fail" => TutorResponse::failed("upstream 500"),
            Some(message) => TutorResponse::ok(format!("echo: {}", message.content)),
            None => TutorResponse::failed("no messages"),
        }
    }
}

fn collaborators(transport: Arc<LoopbackTransport>, catalog: Arc<CountingCatalog>) -> Collaborators {
    Collaborators {
        transport,
        directory: Arc::new(StaticDirectory::new(roster())),
        metadata: catalog,
        signer: Arc::new(StubSigner::default()),
        analytics: Arc::new(RecordingAnalytics::default()),
        tutor: Arc::new(EchoTutor),
        clock: Some(Arc::new(ManualClock::new(T0_MS))),
    }
}

#[tokio::test]
async fn start_wires_services_and_shutdown_releases_subscription() {
    let transport = Arc::new(LoopbackTransport::new());
    let catalog = Arc::new(CountingCatalog::with(vec![
        video("vid-1", Some("vid-2")),
        video("vid-2", None),
    ]));
    let runtime = CoreRuntime::start(
        CoreConfig::default(),
        collaborators(Arc::clone(&transport), Arc::clone(&catalog)),
    )
    .await
    .expect("runtime should start");

    assert_eq!(runtime.connection(), ConnectionStatus::Connected);
    assert_eq!(transport.subscriber_count(), 1);

    transport.publish(
        "notifications",
        json!({"new": {"title": "Cohort", "message": "Welcome @Maria", "type": "informational"}}),
    );
    assert_eq!(runtime.notifications().unread_count(), 1);

    runtime.videos().fetch("vid-1", None).await.expect("fetch vid-1");
    let report = runtime.playback().track_progress("vid-1", 82.0, 100.0);
    assert_eq!(report.prefetch, PrefetchDecision::Issued("vid-2".to_string()));

    runtime.shutdown().await;
    assert_eq!(transport.subscriber_count(), 0);
    assert!(runtime.cache(ResourceFamily::Video).is_cached("vid-2"));
    assert!(runtime.documents().is_empty());
}

#[tokio::test]
async fn tutor_replies_or_apologizes() {
    let runtime = CoreRuntime::start(
        CoreConfig::default(),
        collaborators(
            Arc::new(LoopbackTransport::new()),
            Arc::new(CountingCatalog::default()),
        ),
    )
    .await
    .expect("runtime should start");

    let answered = runtime
        .tutor()
        .reply(vec![ChatMessage::user("How do I register an LLC?")])
        .await;
    assert!(answered.answered);
    assert_eq!(answered.text, "echo: How do I register an LLC?");

    let failed = runtime.tutor().reply(vec![ChatMessage::user("fail")]).await;
    assert_eq!(failed.text, TUTOR_APOLOGY);
}

#[tokio::test]
async fn offline_transport_still_starts_degraded() {
    let transport = Arc::new(LoopbackTransport::new());
    transport.set_offline(true);

    let runtime = CoreRuntime::start(
        CoreConfig::default(),
        collaborators(transport, Arc::new(CountingCatalog::default())),
    )
    .await
    .expect("runtime should start");

    assert_eq!(runtime.connection(), ConnectionStatus::Degraded);
    assert!(!runtime.notifications().is_subscribed());
}

#[tokio::test]
async fn invalid_config_is_rejected_before_wiring() {
    let transport = Arc::new(LoopbackTransport::new());
    let config = CoreConfig::from_json_str(r#"{"playback": {"prefetch_threshold_percent": 80}}"#)
        .expect("partial config should load");
    let mut broken = config.clone();
    broken.notifications.channel = String::new();

    let result = CoreRuntime::start(
        broken,
        collaborators(Arc::clone(&transport), Arc::new(CountingCatalog::default())),
    )
    .await;

    assert!(matches!(result, Err(ConfigError::Invalid(_))));
    assert_eq!(transport.subscriber_count(), 0);
}
