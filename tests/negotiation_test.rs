mod support;

use rtc_signaling::model::{
    IceCandidate, MediaError, NegotiationError, NegotiationEvent, NegotiationState,
    SignalingKind, SignalingMessage,
};
use serde_json::json;
use std::time::Duration;
use support::{
    answer, candidate, test_config, Harness, MockConnector, PeerCall, TrackingCaptureDevice,
};

#[tokio::test]
async fn test_offer_committed_before_it_is_sent() {
    let harness = Harness::new(MockConnector::default());

    let state = harness.negotiator.start().await.unwrap();
    assert_eq!(state, NegotiationState::AwaitingAnswer);

    let calls = harness.peers.log.calls();
    assert!(matches!(calls[0], PeerCall::AddTrack(_)));
    assert_eq!(&calls[1..], &[PeerCall::CreateOffer, PeerCall::SetLocal]);

    let sent = harness.connector.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind(), SignalingKind::Offer);
    let wire: serde_json::Value = serde_json::from_str(&sent[0].to_json().unwrap()).unwrap();
    assert_eq!(wire["type"], "offer");
    assert_eq!(wire["offer"]["type"], "offer");
}

#[tokio::test]
async fn test_local_candidates_follow_the_offer() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();

    let local = IceCandidate::new(candidate(7));
    harness
        .peers
        .events()
        .push(NegotiationEvent::LocalCandidate(local.clone()));
    harness.negotiator.stop().await;

    let sent = harness.connector.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].kind(), SignalingKind::Offer);
    assert_eq!(sent[1], SignalingMessage::Candidate { candidate: local });
}

#[tokio::test]
async fn test_candidates_before_answer_are_replayed_in_order() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();

    harness
        .connector
        .deliver(json!({ "type": "candidate", "candidate": candidate(1) }));
    harness
        .connector
        .deliver(json!({ "type": "candidate", "candidate": candidate(2) }));
    harness.connector.deliver(answer());
    harness
        .connector
        .deliver(json!({ "type": "candidate", "candidate": candidate(3) }));

    let status = harness.negotiator.settled().await;
    assert_eq!(status.state, NegotiationState::Negotiated);
    // stop is queued behind the last candidate
    harness.negotiator.stop().await;

    let calls = harness.peers.log.calls();
    let remote_at = calls
        .iter()
        .position(|c| *c == PeerCall::SetRemote)
        .unwrap();
    let first_candidate_at = calls
        .iter()
        .position(|c| matches!(c, PeerCall::AddCandidate(_)))
        .unwrap();
    assert!(remote_at < first_candidate_at);

    let applied = harness.peers.log.applied_candidates();
    assert_eq!(
        applied,
        vec![
            IceCandidate::new(candidate(1)),
            IceCandidate::new(candidate(2)),
            IceCandidate::new(candidate(3)),
        ]
    );
}

#[tokio::test]
async fn test_duplicate_answer_is_ignored() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();

    harness.connector.deliver(answer());
    harness.connector.deliver(answer());
    harness.negotiator.settled().await;
    harness.negotiator.stop().await;

    let remote_sets = harness
        .peers
        .log
        .calls()
        .into_iter()
        .filter(|c| *c == PeerCall::SetRemote)
        .count();
    assert_eq!(remote_sets, 1);
}

#[tokio::test]
async fn test_malformed_and_unexpected_messages_are_ignored() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();

    harness
        .connector
        .push(NegotiationEvent::Message("{not json".to_string()));
    harness.connector.deliver(json!({ "type": "bye" }));
    harness.connector.deliver(json!({ "type": "answer" }));
    harness
        .connector
        .deliver(json!({ "type": "offer", "offer": { "type": "offer", "sdp": "v=0" } }));
    harness.connector.deliver(answer());

    let status = harness.negotiator.settled().await;
    assert_eq!(status.state, NegotiationState::Negotiated);
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn test_stop_releases_everything_and_is_idempotent() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();
    assert_eq!(harness.capture.live_tracks(), 1);

    harness.negotiator.stop().await;
    assert_eq!(harness.negotiator.state(), NegotiationState::Closed);
    assert!(harness.released());

    harness.negotiator.stop().await;
    assert_eq!(harness.negotiator.state(), NegotiationState::Closed);
    let closes = harness
        .peers
        .log
        .calls()
        .into_iter()
        .filter(|c| *c == PeerCall::Close)
        .count();
    assert_eq!(closes, 1);

    let result = harness.negotiator.start().await;
    assert_eq!(
        result,
        Err(NegotiationError::InvalidState(NegotiationState::Closed))
    );
}

#[tokio::test]
async fn test_stop_after_negotiated_releases_everything() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();
    harness.connector.deliver(answer());
    harness.negotiator.settled().await;

    harness.negotiator.stop().await;
    assert_eq!(harness.negotiator.state(), NegotiationState::Closed);
    assert!(harness.released());
}

#[tokio::test]
async fn test_stop_before_start() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.stop().await;

    assert_eq!(harness.negotiator.state(), NegotiationState::Closed);
    assert_eq!(
        harness
            .connector
            .attempts
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_relay_fails_after_three_attempts() {
    let harness = Harness::new(MockConnector::failing(u32::MAX));

    let result = harness.negotiator.start().await;
    match result {
        Err(NegotiationError::SignalingUnreachable { attempts, url, .. }) => {
            assert_eq!(attempts, 3);
            assert_eq!(url, "ws://relay.test");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    assert_eq!(
        harness
            .connector
            .attempts
            .load(std::sync::atomic::Ordering::SeqCst),
        3
    );
    assert_eq!(harness.negotiator.state(), NegotiationState::Failed);
    assert_eq!(
        harness.negotiator.status().status_line(),
        "signaling server unreachable"
    );
    assert_eq!(harness.peers.created(), 0);
    assert_eq!(harness.capture.acquisitions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_relay_reachable_on_third_attempt() {
    let harness = Harness::new(MockConnector::failing(2));

    let state = harness.negotiator.start().await.unwrap();
    assert_eq!(state, NegotiationState::AwaitingAnswer);
    assert_eq!(
        harness
            .connector
            .attempts
            .load(std::sync::atomic::Ordering::SeqCst),
        3
    );
}

#[tokio::test]
async fn test_camera_failure_releases_channel() {
    let harness = Harness::with(
        MockConnector::default(),
        TrackingCaptureDevice::failing(MediaError::DeviceBusy),
        test_config(),
    );

    let result = harness.negotiator.start().await;
    assert_eq!(
        result,
        Err(NegotiationError::MediaAcquisition(MediaError::DeviceBusy))
    );
    assert_eq!(harness.negotiator.state(), NegotiationState::Failed);
    assert!(harness.connector.is_closed());
    assert!(harness.connector.sent().is_empty());
    assert_eq!(harness.peers.created(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_answer_times_out() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();

    let status = harness.negotiator.settled().await;
    assert_eq!(status.state, NegotiationState::Failed);
    assert_eq!(
        status.last_error,
        Some(NegotiationError::NegotiationTimeout(Duration::from_secs(30)))
    );
    assert_eq!(status.status_line(), "remote peer did not answer");
    assert!(harness.released());
}

#[tokio::test(start_paused = true)]
async fn test_answer_before_deadline_cancels_timeout() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();
    harness.connector.deliver(answer());
    harness.negotiator.settled().await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.negotiator.state(), NegotiationState::Negotiated);
}

#[tokio::test]
async fn test_peer_failure_after_negotiated() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();
    harness.connector.deliver(answer());
    harness.negotiator.settled().await;

    let mut updates = harness.negotiator.subscribe();
    harness
        .peers
        .events()
        .push(NegotiationEvent::PeerSessionFailed("ice failed".to_string()));
    let status = updates
        .wait_for(|s| s.state == NegotiationState::Failed)
        .await
        .unwrap()
        .clone();

    assert!(matches!(
        status.last_error,
        Some(NegotiationError::PeerSession(_))
    ));
    assert_eq!(status.status_line(), "peer connection failed");
    assert!(harness.released());
}

#[tokio::test]
async fn test_channel_lost_while_awaiting_answer() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();

    harness.connector.push(NegotiationEvent::ChannelClosed);
    let status = harness.negotiator.settled().await;

    assert_eq!(status.state, NegotiationState::Failed);
    assert!(matches!(
        status.last_error,
        Some(NegotiationError::SignalingUnreachable { .. })
    ));
    assert!(harness.released());
}

#[tokio::test]
async fn test_channel_lost_after_negotiated_keeps_peer() {
    let harness = Harness::new(MockConnector::default());
    harness.negotiator.start().await.unwrap();
    harness.connector.deliver(answer());
    harness.negotiator.settled().await;

    harness.connector.push(NegotiationEvent::ChannelClosed);
    // local candidate after the channel is gone goes nowhere
    harness
        .peers
        .events()
        .push(NegotiationEvent::LocalCandidate(IceCandidate::new(candidate(9))));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(harness.negotiator.state(), NegotiationState::Negotiated);
    assert!(harness.connector.is_closed());
    assert!(!harness.peers.log.is_closed());
    assert_eq!(harness.connector.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_connect_retry_releases_after_start_settles() {
    let harness = Harness::new(MockConnector::failing(1));
    let negotiator = harness.negotiator.clone();
    let start = tokio::spawn(async move { negotiator.start().await });

    // first attempt refused, the negotiation now waits out the backoff
    while harness
        .connector
        .attempts
        .load(std::sync::atomic::Ordering::SeqCst)
        == 0
    {
        tokio::task::yield_now().await;
    }
    assert_eq!(harness.negotiator.state(), NegotiationState::AcquiringMedia);

    harness.negotiator.stop().await;

    assert_eq!(
        start.await.unwrap(),
        Ok(NegotiationState::AwaitingAnswer)
    );
    assert_eq!(harness.negotiator.state(), NegotiationState::Closed);
    assert_eq!(harness.capture.acquisitions(), 1);
    assert!(harness.released());
}

#[tokio::test]
async fn test_dropping_every_handle_releases_resources() {
    let Harness {
        negotiator,
        capture,
        peers,
        connector,
    } = Harness::new(MockConnector::default());
    negotiator.start().await.unwrap();
    let mut updates = negotiator.subscribe();
    assert_eq!(capture.live_tracks(), 1);

    drop(negotiator);

    let status = tokio::time::timeout(
        Duration::from_secs(2),
        updates.wait_for(|s| s.state == NegotiationState::Closed),
    )
    .await
    .expect("negotiation never closed")
    .map(|status| status.clone());
    assert!(status.is_ok());
    assert_eq!(capture.live_tracks(), 0);
    assert!(peers.log.is_closed());
    assert!(connector.is_closed());
}
