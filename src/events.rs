use crate::camera::{Facing, Resolution};
use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events published by the camera core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CameraEvent {
    /// A camera handle was opened or closed
    CameraChanged {
        facing: Facing,
        open: bool,
        timestamp: SystemTime,
    },
    /// Preview is running with the negotiated sizes
    PreviewStarted {
        preview: Option<Resolution>,
        picture: Option<Resolution>,
        timestamp: SystemTime,
    },
    /// A corrected still was handed to the UI
    PictureTaken {
        capture_id: Uuid,
        width: u32,
        height: u32,
        rotation: u32,
        mirrored: bool,
        timestamp: SystemTime,
    },
    /// A transition failed in a component
    SystemError { component: String, error: String },
}

impl CameraEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            CameraEvent::CameraChanged { timestamp, .. } => *timestamp,
            CameraEvent::PreviewStarted { timestamp, .. } => *timestamp,
            CameraEvent::PictureTaken { timestamp, .. } => *timestamp,
            CameraEvent::SystemError { .. } => SystemTime::now(),
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            CameraEvent::CameraChanged { facing, open, .. } => {
                format!(
                    "{} camera {}",
                    facing,
                    if *open { "opened" } else { "closed" }
                )
            }
            CameraEvent::PreviewStarted {
                preview, picture, ..
            } => {
                format!(
                    "Preview started (preview {}, picture {})",
                    describe_size(preview),
                    describe_size(picture)
                )
            }
            CameraEvent::PictureTaken {
                capture_id,
                width,
                height,
                rotation,
                mirrored,
                ..
            } => {
                format!(
                    "Picture {} taken: {}x{}, rotated {}°{}",
                    capture_id,
                    width,
                    height,
                    rotation,
                    if *mirrored { ", mirrored" } else { "" }
                )
            }
            CameraEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
        }
    }

    /// Topic name used for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CameraEvent::CameraChanged { .. } => "camera_changed",
            CameraEvent::PreviewStarted { .. } => "preview_started",
            CameraEvent::PictureTaken { .. } => "picture_taken",
            CameraEvent::SystemError { .. } => "system_error",
        }
    }
}

fn describe_size(size: &Option<Resolution>) -> String {
    size.map(|s| s.to_string())
        .unwrap_or_else(|| "device default".to_string())
}

/// Event bus for decoupled notification using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<CameraEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to every event
    pub fn subscribe(&self) -> broadcast::Receiver<CameraEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to the events accepted by a filter
    pub fn subscribe_to<S: Into<String>>(&self, filter: EventFilter, name: S) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.into())
    }

    /// Run `handler` for every event on the given topics. Must be called
    /// from within a tokio runtime; the handler task ends when the bus closes.
    pub fn on<S, F>(
        &self,
        topics: Vec<&'static str>,
        name: S,
        handler: F,
    ) -> tokio::task::JoinHandle<()>
    where
        S: Into<String>,
        F: Fn(CameraEvent) + Send + 'static,
    {
        let mut receiver = self.subscribe_to(EventFilter::EventTypes(topics), name);

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => handler(event),
                    Err(EventBusError::ChannelClosed) => break,
                    Err(e) => {
                        warn!("Handler '{}' missed events: {}", receiver.name(), e);
                    }
                }
            }
            debug!("Handler '{}' finished", receiver.name());
        })
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: CameraEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            CameraEvent::CameraChanged { .. } | CameraEvent::PictureTaken { .. } => {
                info!("{}", event.description());
            }
            CameraEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Accept errors from specific components
    Components(Vec<String>),
    /// Custom filter function
    Custom(fn(&CameraEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &CameraEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Components(components) => {
                if let CameraEvent::SystemError { component, .. } = event {
                    components.contains(component)
                } else {
                    false
                }
            }
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<CameraEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<CameraEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<CameraEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<CameraEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{timeout, Duration};

    fn camera_changed(open: bool) -> CameraEvent {
        CameraEvent::CameraChanged {
            facing: Facing::Back,
            open,
            timestamp: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus.publish(camera_changed(true)).unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            CameraEvent::CameraChanged { open, facing, .. } => {
                assert!(open);
                assert_eq!(facing, Facing::Back);
            }
            _ => panic!("Unexpected event type"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_fails() {
        let event_bus = EventBus::new(10);
        assert!(!event_bus.has_subscribers());
        assert!(matches!(
            event_bus.publish(camera_changed(false)),
            Err(EventBusError::PublishFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish(camera_changed(true)).unwrap();

        let _ = timeout(Duration::from_millis(100), receiver1.recv())
            .await
            .unwrap()
            .unwrap();
        let _ = timeout(Duration::from_millis(100), receiver2.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::EventTypes(vec!["camera_changed"]);

        let preview = CameraEvent::PreviewStarted {
            preview: Some(Resolution::new(1280, 720)),
            picture: None,
            timestamp: SystemTime::now(),
        };

        assert!(filter.matches(&camera_changed(true)));
        assert!(!filter.matches(&preview));

        let components = EventFilter::Components(vec!["capture".to_string()]);
        assert!(components.matches(&CameraEvent::SystemError {
            component: "capture".to_string(),
            error: "boom".to_string(),
        }));
        assert!(!components.matches(&preview));

        let custom = EventFilter::Custom(|event| {
            matches!(event, CameraEvent::CameraChanged { open: false, .. })
        });
        assert!(custom.matches(&camera_changed(false)));
        assert!(!custom.matches(&camera_changed(true)));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let mut filtered =
            event_bus.subscribe_to(EventFilter::EventTypes(vec!["picture_taken"]), "test");

        event_bus.publish(camera_changed(true)).unwrap();
        event_bus
            .publish(CameraEvent::PictureTaken {
                capture_id: Uuid::new_v4(),
                width: 3,
                height: 4,
                rotation: 90,
                mirrored: true,
                timestamp: SystemTime::now(),
            })
            .unwrap();

        let received = timeout(Duration::from_millis(100), filtered.recv())
            .await
            .unwrap()
            .unwrap();
        match received {
            CameraEvent::PictureTaken { rotation, mirrored, .. } => {
                assert_eq!(rotation, 90);
                assert!(mirrored);
            }
            _ => panic!("Unexpected event type"),
        }
        assert!(filtered.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_topic_handler() {
        let event_bus = EventBus::new(10);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let handle = event_bus.on(vec!["camera_changed"], "counter", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        event_bus.publish(camera_changed(true)).unwrap();
        event_bus
            .publish(CameraEvent::SystemError {
                component: "test".to_string(),
                error: "ignored".to_string(),
            })
            .unwrap();
        event_bus.publish(camera_changed(false)).unwrap();

        drop(event_bus);
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_event_properties() {
        let event = camera_changed(true);
        assert_eq!(event.event_type(), "camera_changed");
        assert_eq!(event.description(), "back camera opened");

        let preview = CameraEvent::PreviewStarted {
            preview: Some(Resolution::new(800, 600)),
            picture: None,
            timestamp: SystemTime::now(),
        };
        assert!(preview.description().contains("800x600"));
        assert!(preview.description().contains("device default"));
    }
}
