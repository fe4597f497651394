//! Tests that exercise the crate's public re-exports.

use std::sync::Arc;

use rstest::rstest;
use tokio_util::sync::CancellationToken;

use conduit_config::Config;

use crate::{HealthReporter, LaunchError, StaticConfigLoader, bootstrap_with, run_daemon_with};

use super::support::{
    self, FailingConfigLoader, HealthEvent, RecordingHealthReporter, TestConfigLoader,
};

#[rstest]
fn bootstrap_with_reexport_initialises_daemon() {
    let loader = TestConfigLoader::new().with_max_connections(3);
    let reporter = Arc::new(RecordingHealthReporter::default());

    let daemon = bootstrap_with(&loader, reporter.clone()).expect("bootstrap should succeed");

    assert_eq!(daemon.config().max_connections(), 3);
    assert_eq!(daemon.config().endpoint(), &loader.endpoint());
    let events = reporter.events();
    assert!(events.contains(&HealthEvent::BootstrapStarting));
    assert!(events.contains(&HealthEvent::BootstrapSucceeded));
}

#[rstest]
#[tokio::test]
async fn run_daemon_with_reports_bootstrap_failure() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let shutdown = CancellationToken::new();

    let error = run_daemon_with(&FailingConfigLoader, reporter.clone(), &shutdown)
        .await
        .expect_err("relative endpoint must be rejected");

    assert!(matches!(error, LaunchError::Bootstrap(_)), "{error:?}");
    let events = reporter.events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, HealthEvent::BootstrapFailed(_))),
        "{events:?}"
    );
}

#[rstest]
#[tokio::test]
async fn run_daemon_with_stops_when_shutdown_fires() {
    let loader = TestConfigLoader::new().with_max_connections(2);
    let recorder = Arc::new(RecordingHealthReporter::default());
    let reporter: Arc<dyn HealthReporter> = recorder.clone();
    let shutdown = CancellationToken::new();

    let daemon = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { run_daemon_with(&loader, reporter, &shutdown).await })
    };
    let started = support::eventually(|| {
        recorder
            .events()
            .iter()
            .any(|event| matches!(event, HealthEvent::RemoteControlStarted { .. }))
    })
    .await;
    assert!(started, "{:?}", recorder.events());

    shutdown.cancel();
    support::within(daemon)
        .await
        .expect("daemon task completes")
        .expect("daemon stops cleanly");

    let events = recorder.events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, HealthEvent::RemoteControlStopped(_))),
        "{events:?}"
    );
}

#[rstest]
#[tokio::test]
async fn zero_ceiling_runs_without_an_endpoint() {
    let loader = StaticConfigLoader::new(Config {
        max_connections: 0,
        log_filter: "warn".to_owned(),
        ..Config::default()
    });
    let recorder = Arc::new(RecordingHealthReporter::default());
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    run_daemon_with(&loader, recorder.clone(), &shutdown)
        .await
        .expect("daemon without endpoint stops cleanly");

    let events = recorder.events();
    assert!(events.contains(&HealthEvent::BootstrapSucceeded), "{events:?}");
    assert!(events.contains(&HealthEvent::RemoteControlDisabled), "{events:?}");
}

#[cfg(unix)]
#[rstest]
#[tokio::test]
async fn unix_clients_receive_framed_responses() {
    use conduit_protocol::{CommandRequest, CommandResponse, Sequence, unescape};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixStream;

    let loader = TestConfigLoader::new().with_max_connections(1);
    let endpoint = loader.endpoint();
    let recorder = Arc::new(RecordingHealthReporter::default());
    let reporter: Arc<dyn HealthReporter> = recorder.clone();
    let shutdown = CancellationToken::new();
    let daemon = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { run_daemon_with(&loader, reporter, &shutdown).await })
    };
    let started = support::eventually(|| {
        recorder
            .events()
            .iter()
            .any(|event| matches!(event, HealthEvent::RemoteControlStarted { .. }))
    })
    .await;
    assert!(started, "{:?}", recorder.events());

    let stream = support::within(UnixStream::connect(endpoint.as_path()))
        .await
        .expect("client connects");
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let request = CommandRequest::new("echo {braces} and \\slashes");
    let mut line = request.to_line().expect("request serialises");
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .expect("request is written");

    let mut output = String::new();
    let terminal = loop {
        let line = support::within(lines.next_line())
            .await
            .expect("response is readable")
            .expect("daemon keeps the channel open");
        let response = CommandResponse::parse(&line).expect("response parses");
        assert_eq!(response.id, request.id);
        output.push_str(&unescape(&response.chunk).expect("chunk is escaped"));
        if response.sequence.is_terminal() {
            break response.sequence;
        }
    };

    assert_eq!(terminal, Sequence::Completed);
    assert_eq!(output, "{braces} and \\slashes\n");

    drop(writer);
    shutdown.cancel();
    support::within(daemon)
        .await
        .expect("daemon task completes")
        .expect("daemon stops cleanly");
}
