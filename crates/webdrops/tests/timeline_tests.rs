//! End-to-end radar timeline resolution against a scripted upstream.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use test_utils::{assert_root_err, fast_retry, shared_config, timeline, FakeTransport, Scripted};
use webdrops::{RadarVariable, Session, TimelineResolver, WebdropsClient, WebdropsError};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 1, hour, minute, 0).unwrap()
}

async fn client(fake: &Arc<FakeTransport>) -> WebdropsClient {
    let mut session = Session::new(shared_config(), fake.clone());
    session.login().await.unwrap();
    WebdropsClient::new(session, fast_retry())
}

fn publish(fake: &FakeTransport, variable: RadarVariable, instants: &[&str]) {
    fake.respond_json(
        "GET",
        &format!("coverages/{}/", variable.coverage()),
        timeline(instants),
    );
}

#[tokio::test]
async fn test_missing_layer_falls_back_to_earliest_neighbour() {
    let fake = Arc::new(FakeTransport::with_login());
    publish(&fake, RadarVariable::Cappi2, &["202306011130", "202306011200", "202306011230"]);
    publish(&fake, RadarVariable::Cappi3, &["202306011130", "202306011200", "202306011230"]);
    publish(&fake, RadarVariable::Cappi5, &["202306011130", "202306011230"]);
    let mut client = client(&fake).await;

    let best = TimelineResolver::default()
        .resolve(&mut client, at(12, 0), &RadarVariable::ASSIMILATED)
        .await
        .unwrap();

    assert_eq!(best, at(11, 30));
    assert_eq!(fake.count("GET", "coverages/"), 3);
}

#[tokio::test]
async fn test_exact_instant_shared_by_all_layers() {
    let fake = Arc::new(FakeTransport::with_login());
    for variable in RadarVariable::ASSIMILATED {
        publish(&fake, variable, &["202306011150", "202306011200", "202306011210"]);
    }
    let mut client = client(&fake).await;

    let best = TimelineResolver::default()
        .resolve(&mut client, at(12, 0), &RadarVariable::ASSIMILATED)
        .await
        .unwrap();
    assert_eq!(best, at(12, 0));
}

#[tokio::test]
async fn test_unsorted_upstream_timelines() {
    let fake = Arc::new(FakeTransport::with_login());
    publish(&fake, RadarVariable::Cappi2, &["202306011220", "202306011140", "202306011205"]);
    publish(&fake, RadarVariable::Cappi3, &["202306011205", "202306011220"]);
    let mut client = client(&fake).await;

    let best = TimelineResolver::default()
        .resolve(
            &mut client,
            at(12, 0),
            &[RadarVariable::Cappi2, RadarVariable::Cappi3],
        )
        .await
        .unwrap();
    assert_eq!(best, at(12, 5));
}

#[tokio::test]
async fn test_disjoint_timelines() {
    let fake = Arc::new(FakeTransport::with_login());
    publish(&fake, RadarVariable::Cappi2, &["202306011130"]);
    publish(&fake, RadarVariable::Cappi3, &["202306011230"]);
    let mut client = client(&fake).await;

    let err = TimelineResolver::default()
        .resolve(
            &mut client,
            at(12, 0),
            &[RadarVariable::Cappi2, RadarVariable::Cappi3],
        )
        .await
        .unwrap_err();

    match err {
        WebdropsError::NoCommonInstant {
            requested,
            variables,
        } => {
            assert_eq!(requested, "202306011200");
            assert_eq!(variables, vec!["CAPPI2", "CAPPI3"]);
        }
        other => panic!("expected NoCommonInstant, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeline_request_window() {
    let fake = Arc::new(FakeTransport::with_login());
    publish(&fake, RadarVariable::Cappi4, &["202306011200"]);
    let mut client = client(&fake).await;

    TimelineResolver::new(
        std::time::Duration::from_secs(3600),
        std::time::Duration::from_secs(600),
    )
    .resolve(&mut client, at(12, 0), &[RadarVariable::Cappi4])
    .await
    .unwrap();

    let last = fake.requests().pop().unwrap();
    assert!(last.url.ends_with(
        "coverages/RADAR_DPC_HDF5_CAPPI4/?from=202306011100&to=202306011210"
    ));
}

#[tokio::test]
async fn test_timeline_failure_propagates() {
    let fake = Arc::new(FakeTransport::with_login());
    publish(&fake, RadarVariable::Cappi2, &["202306011200"]);
    fake.script(
        "GET",
        &format!("coverages/{}/", RadarVariable::Cappi3.coverage()),
        vec![Scripted::status(500)],
    );
    let mut client = client(&fake).await;

    assert_root_err!(
        TimelineResolver::default()
            .resolve(
                &mut client,
                at(12, 0),
                &[RadarVariable::Cappi2, RadarVariable::Cappi3],
            )
            .await,
        WebdropsError::Transport {
            status: Some(500),
            ..
        }
    );
}

#[tokio::test]
async fn test_no_variables() {
    let fake = Arc::new(FakeTransport::with_login());
    let mut client = client(&fake).await;

    let result = TimelineResolver::default()
        .resolve(&mut client, at(12, 0), &[])
        .await;
    assert!(matches!(result, Err(WebdropsError::Config(_))));
    assert_eq!(fake.count("GET", ""), 0);
}
