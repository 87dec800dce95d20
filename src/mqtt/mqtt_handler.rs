use chrono::{DateTime, Local};
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Packet, QoS};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::MqttConfig;
use super::message_manager::{ChannelEvent, MQTTMessage, MsgManager};

const MAX_ERROR_MESSAGES: usize = 20;

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Clone, Debug, Default)]
pub struct MQTTStatus {
    pub connection_state: ConnectionState,
    pub error_messages: Vec<String>,
    pub messages_received: usize,
    pub messages_sent: usize,
    pub messages_dropped: usize,
    pub resyncs_requested: usize,
    pub last_activity: Option<DateTime<Local>>,
}

impl MQTTStatus {
    fn record_error(&mut self, message: String) {
        if self.error_messages.len() == MAX_ERROR_MESSAGES {
            self.error_messages.remove(0);
        }
        self.error_messages.push(message);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Not connected to the broker")]
    NotConnected,

    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),
}

/// Channel task between the broker and the control loop.
///
/// Owns the rumqttc event loop; reconnection is left to rumqttc, which
/// reconnects on the next poll after an error. Publications handed over
/// while disconnected are dropped. Whenever the broker may be missing the
/// current state (every ConnAck, every publication rumqttc refused) the
/// resync counter is bumped and the loop republishes all outputs.
pub struct MqttHandler {
    status: MQTTStatus,
    client: AsyncClient,
    eventloop: EventLoop,
    config: MqttConfig,
    subscriptions: Vec<String>,
    msg_manager: MsgManager,
    cancel: CancellationToken,
}

impl MqttHandler {
    pub fn new(
        config: MqttConfig,
        subscriptions: Vec<String>,
        msg_in: mpsc::Receiver<MQTTMessage>,
        msg_out: mpsc::Sender<ChannelEvent>,
        resync: watch::Sender<u64>,
        cancel: CancellationToken,
    ) -> Self {
        let msg_manager = MsgManager {
            received_msg: msg_out,
            distribution_msg: msg_in,
            resync,
        };
        let (client, eventloop) = AsyncClient::new(config.options(), config.channel_capacity);

        MqttHandler {
            status: MQTTStatus::default(),
            client,
            eventloop,
            config,
            subscriptions,
            msg_manager,
            cancel,
        }
    }

    pub async fn run(mut self) -> MQTTStatus {
        info!(
            "Connecting to MQTT broker {}:{} as {}",
            self.config.host, self.config.port, self.config.client_id
        );
        self.status.connection_state = ConnectionState::Connecting;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("MQTT handler shutting down");
                    if let Err(e) = self.client.try_disconnect() {
                        debug!("Disconnect request failed: {}", e);
                    }
                    self.status.connection_state = ConnectionState::Disconnected;
                    break;
                }
                event = self.eventloop.poll() => {
                    if let Err(e) = event.map(|event| self.handle_event(event)) {
                        self.handle_connection_error(e).await;
                    }
                }
                Some(msg) = self.msg_manager.distribution_msg.recv() => {
                    self.handle_outbound(msg);
                }
            }
        }

        info!(
            "MQTT handler stopped: {} received, {} sent, {} dropped, {} resyncs",
            self.status.messages_received,
            self.status.messages_sent,
            self.status.messages_dropped,
            self.status.resyncs_requested
        );
        self.status
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                info!("MQTT connected ({:?})", ack.code);
                self.status.connection_state = ConnectionState::Connected;
                self.status.last_activity = Some(Local::now());
                for topic in &self.subscriptions {
                    match self.client.try_subscribe(topic.clone(), self.config.qos.into()) {
                        Ok(()) => info!("Subscribed to {}", topic),
                        Err(e) => error!("Subscribing to {} failed: {}", topic, e),
                    }
                }
                self.request_resync("new broker session");
            }
            Event::Incoming(Packet::Publish(publish)) => {
                self.status.messages_received += 1;
                self.status.last_activity = Some(Local::now());
                let content = String::from_utf8_lossy(&publish.payload).into_owned();
                info!("Received on {}: {}", publish.topic, content);
                self.notify(ChannelEvent::Message(MQTTMessage::from_topic(
                    publish.topic,
                    content,
                )));
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Broker closed the session");
                self.status.connection_state = ConnectionState::Reconnecting;
                self.notify(ChannelEvent::Disconnected("broker disconnect".to_string()));
            }
            other => debug!("MQTT event: {:?}", other),
        }
    }

    async fn handle_connection_error(&mut self, e: ConnectionError) {
        if self.status.connection_state == ConnectionState::Connected {
            self.notify(ChannelEvent::Disconnected(e.to_string()));
        }
        warn!(
            "MQTT connection error: {}, retrying in {}ms",
            e, self.config.reconnect_delay_ms
        );
        self.status.connection_state = ConnectionState::Reconnecting;
        self.status.record_error(e.to_string());

        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(self.config.reconnect_delay()) => {}
        }
    }

    fn handle_outbound(&mut self, msg: MQTTMessage) {
        match self.publish(&msg) {
            Ok(()) => debug!("Published {}", msg),
            Err(ChannelError::NotConnected) => {
                // The next ConnAck resyncs everything.
                self.status.messages_dropped += 1;
                debug!("Dropped {} while offline", msg);
            }
            Err(e) => {
                warn!("Publishing {} failed: {}", msg, e);
                self.status.messages_dropped += 1;
                self.status.record_error(e.to_string());
                self.request_resync("publication refused by client");
            }
        }
    }

    fn publish(&mut self, msg: &MQTTMessage) -> Result<(), ChannelError> {
        if self.status.connection_state != ConnectionState::Connected {
            return Err(ChannelError::NotConnected);
        }
        let qos: QoS = self.config.qos.into();
        self.client.try_publish(
            msg.topic(),
            qos,
            self.config.retain,
            msg.content().as_bytes().to_vec(),
        )?;
        self.status.messages_sent += 1;
        self.status.last_activity = Some(Local::now());
        info!("Published {} to {}", msg.content(), msg.topic());
        Ok(())
    }

    fn request_resync(&mut self, reason: &str) {
        let generation = self.msg_manager.request_resync();
        self.status.resyncs_requested += 1;
        debug!("Requested state resync #{}: {}", generation, reason);
    }

    fn notify(&self, event: ChannelEvent) {
        match self.msg_manager.received_msg.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Control loop inbox full, dropping {:?}", event)
            }
            Err(TrySendError::Closed(_)) => debug!("Control loop gone, event discarded"),
        }
    }
}
