use super::event::Command;
use super::{
    connect_with_retry, EventQueue, NegotiationContext, NegotiationEvent, NegotiationState,
    NegotiationStatus,
};
use crate::config::ClientConfig;
use crate::model::{
    CaptureDevice, IceCandidate, NegotiationError, PeerSessionError, PeerSessionFactory,
    SessionDescription, SignalingMessage, TransportConnector, VideoSink,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Collaborators a negotiation drives
#[derive(Clone)]
pub struct NegotiatorDeps {
    pub capture: Arc<dyn CaptureDevice>,
    pub sink: Arc<dyn VideoSink>,
    pub peers: Arc<dyn PeerSessionFactory>,
    pub connector: Arc<dyn TransportConnector>,
}

/// Handle to one offering negotiation.
///
/// The state machine runs on its own task and consumes a single queue that
/// carries `start`/`stop` requests together with transport and peer-session
/// events, so transitions never overlap and events are handled in arrival
/// order. The task exits after `stop`.
#[derive(Clone)]
pub struct Negotiator {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<NegotiationStatus>,
}

impl Negotiator {
    pub fn spawn(config: ClientConfig, deps: NegotiatorDeps) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (status_sender, status) = watch::channel(NegotiationStatus::default());
        let actor = NegotiationActor {
            config,
            deps,
            context: NegotiationContext::default(),
            queue: commands.downgrade(),
            status: status_sender,
            answer_deadline: None,
        };
        tokio::spawn(actor.run(inbox));
        Self { commands, status }
    }

    /// Run the setup sequence up to AWAITING_ANSWER. A setup failure leaves
    /// the negotiation FAILED with every resource released.
    pub async fn start(&self) -> Result<NegotiationState, NegotiationError> {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Start(reply)).is_err() {
            return Err(NegotiationError::InvalidState(self.state()));
        }
        response
            .await
            .unwrap_or_else(|_| Err(NegotiationError::InvalidState(self.state())))
    }

    /// Release everything and move to CLOSED. Safe from any state and any
    /// number of times; an in-flight `start` settles first.
    pub async fn stop(&self) {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Stop(reply)).is_ok() {
            let _ = response.await;
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.status.borrow().state
    }

    pub fn status(&self) -> NegotiationStatus {
        self.status.borrow().clone()
    }

    pub fn last_error(&self) -> Option<NegotiationError> {
        self.status.borrow().last_error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NegotiationStatus> {
        self.status.clone()
    }

    /// Wait until NEGOTIATED, FAILED or CLOSED
    pub async fn settled(&self) -> NegotiationStatus {
        let mut status = self.status.clone();
        let settled = match status.wait_for(|s| s.state.is_settled()).await {
            Ok(settled) => (*settled).clone(),
            Err(_) => self.status(),
        };
        settled
    }
}

struct NegotiationActor {
    config: ClientConfig,
    deps: NegotiatorDeps,
    context: NegotiationContext,
    // weak so the task ends once every handle is gone
    queue: mpsc::WeakUnboundedSender<Command>,
    status: watch::Sender<NegotiationStatus>,
    answer_deadline: Option<Instant>,
}

impl NegotiationActor {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Command>) {
        loop {
            let next = match self.answer_deadline {
                Some(deadline) => match timeout_at(deadline, inbox.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        self.on_answer_timeout().await;
                        continue;
                    }
                },
                None => inbox.recv().await,
            };
            let Some(command) = next else {
                break;
            };

            match command {
                Command::Start(reply) => {
                    let result = self.start().await;
                    let _ = reply.send(result);
                }
                Command::Stop(reply) => {
                    self.stop().await;
                    let _ = reply.send(());
                    break;
                }
                Command::Event(event) => self.handle_event(event).await,
            }
        }
        if self.context.state() != NegotiationState::Closed {
            debug!("Every handle dropped, releasing resources");
            self.stop().await;
        }
        debug!("Negotiation task finished");
    }

    #[instrument(skip(self), fields(url = %self.config.signaling_url))]
    async fn start(&mut self) -> Result<NegotiationState, NegotiationError> {
        let state = self.context.state();
        if state != NegotiationState::Idle {
            warn!(%state, "Start rejected");
            return Err(NegotiationError::InvalidState(state));
        }
        let events = EventQueue::negotiator(self.queue.clone());

        match self.setup(events).await {
            Ok(()) => Ok(self.context.state()),
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn setup(&mut self, events: EventQueue) -> Result<(), NegotiationError> {
        self.transition(NegotiationState::AcquiringMedia);

        let transport = connect_with_retry(
            self.deps.connector.as_ref(),
            &self.config.signaling_url,
            &events,
            &self.config.retry,
            self.config.connect_timeout,
        )
        .await?;
        self.context.transport = Some(transport);

        // camera errors are terminal, no retry
        let stream = self.deps.capture.acquire(&self.config.media).await?;
        info!(
            stream_id = %stream.id(),
            tracks = stream.tracks().len(),
            "Local media acquired"
        );
        self.deps.sink.attach(&stream);
        self.context.local_stream = Some(stream);

        self.transition(NegotiationState::CreatingOffer);
        let peer = self
            .deps
            .peers
            .create(&self.config.ice_servers, events)
            .await?;
        self.context.peer_session = Some(peer);

        let offer = self.context.commit_offer().await?;
        if let Some(transport) = &self.context.transport {
            transport.send(&SignalingMessage::Offer { offer });
        }
        info!("Offer sent");

        self.answer_deadline = Some(Instant::now() + self.config.answer_timeout);
        self.transition(NegotiationState::AwaitingAnswer);
        Ok(())
    }

    async fn stop(&mut self) {
        self.answer_deadline = None;
        self.context.teardown().await;
        if self.context.state() != NegotiationState::Closed {
            self.transition(NegotiationState::Closed);
        }
    }

    async fn handle_event(&mut self, event: NegotiationEvent) {
        match event {
            NegotiationEvent::Message(text) => self.handle_message(&text).await,
            NegotiationEvent::LocalCandidate(candidate) => self.send_local_candidate(candidate),
            NegotiationEvent::ChannelClosed => self.on_channel_closed().await,
            NegotiationEvent::PeerSessionFailed(reason) => {
                self.on_peer_session_failed(reason).await
            }
        }
    }

    async fn handle_message(&mut self, text: &str) {
        let message = match SignalingMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, status = e.status(), "Dropping signaling message");
                return;
            }
        };
        debug!(
            kind = %message.kind(),
            state = %self.context.state(),
            "Signaling message received"
        );

        match message {
            SignalingMessage::Offer { .. } => {
                warn!("Ignoring inbound offer, this client is the offering party");
            }
            SignalingMessage::Answer { answer } => self.on_answer(answer).await,
            SignalingMessage::Candidate { candidate } => {
                self.on_remote_candidate(candidate).await
            }
        }
    }

    async fn on_answer(&mut self, answer: SessionDescription) {
        match self.context.state() {
            NegotiationState::AwaitingAnswer => {
                if let Err(e) = self.context.apply_answer(answer).await {
                    self.fail(e).await;
                    return;
                }
                self.answer_deadline = None;
                self.transition(NegotiationState::Negotiated);
            }
            NegotiationState::Negotiated => debug!("Duplicate answer ignored"),
            state => debug!(%state, "Answer ignored"),
        }
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate) {
        match self.context.state() {
            NegotiationState::AwaitingAnswer | NegotiationState::Negotiated => {
                self.context.accept_candidate(candidate).await;
            }
            state => debug!(%state, "Remote candidate ignored"),
        }
    }

    fn send_local_candidate(&self, candidate: IceCandidate) {
        match &self.context.transport {
            Some(transport) => transport.send(&SignalingMessage::Candidate { candidate }),
            None => debug!("No signaling channel, local candidate dropped"),
        }
    }

    async fn on_channel_closed(&mut self) {
        match self.context.state() {
            NegotiationState::AwaitingAnswer => {
                let error = NegotiationError::SignalingUnreachable {
                    url: self.config.signaling_url.clone(),
                    attempts: 1,
                    reason: "channel closed while awaiting answer".to_string(),
                };
                self.fail(error).await;
            }
            NegotiationState::Negotiated => {
                info!("Signaling channel closed, peer connection kept");
                if let Some(transport) = self.context.transport.take() {
                    transport.close();
                }
            }
            state => debug!(%state, "Channel closed"),
        }
    }

    async fn on_peer_session_failed(&mut self, reason: String) {
        match self.context.state() {
            NegotiationState::AwaitingAnswer | NegotiationState::Negotiated => {
                let error = PeerSessionError::new("connection", reason).into();
                self.fail(error).await;
            }
            state => debug!(%state, %reason, "Peer session failure ignored"),
        }
    }

    async fn on_answer_timeout(&mut self) {
        self.answer_deadline = None;
        if self.context.state() == NegotiationState::AwaitingAnswer {
            self.fail(NegotiationError::NegotiationTimeout(self.config.answer_timeout))
                .await;
        }
    }

    async fn fail(&mut self, error: NegotiationError) -> NegotiationError {
        error!(error = %error, status = error.status(), "Negotiation failed");
        self.answer_deadline = None;
        self.context.teardown().await;
        self.context.state = NegotiationState::Failed;
        self.status.send_modify(|status| {
            status.state = NegotiationState::Failed;
            status.last_error = Some(error.clone());
        });
        error
    }

    fn transition(&mut self, state: NegotiationState) {
        info!(from = %self.context.state(), to = %state, "Negotiation state changed");
        self.context.state = state;
        self.status.send_modify(|status| status.state = state);
    }
}
