//! Event pump: the asynchronous side of the console
//!
//! Drains transport events in delivery order, applies them to the session
//! under its lock, resolves the startup gate, and renders notifications. A
//! lost connection is shown to the user and raises the shutdown flag so the
//! console stops reading.

use tracing::{debug, error, info};

use crate::screen::NotificationSink;
use crate::shutdown::ShutdownFlag;
use xc_core::{EventReceiver, Notice, ReadySignal, SharedSession, TransportEvent};

pub struct EventPump {
    session: SharedSession,
    sink: NotificationSink,
    ready: ReadySignal,
    shutdown: ShutdownFlag,
    events: EventReceiver,
}

impl EventPump {
    pub fn new(
        session: SharedSession,
        sink: NotificationSink,
        ready: ReadySignal,
        shutdown: ShutdownFlag,
        events: EventReceiver,
    ) -> Self {
        Self {
            session,
            sink,
            ready,
            shutdown,
            events,
        }
    }

    pub async fn run(mut self) {
        let mut stream_closed = true;
        while let Some(event) = self.events.recv().await {
            match self.handle(event) {
                Ok(true) => {}
                Ok(false) => {
                    stream_closed = false;
                    break;
                }
                Err(e) => {
                    error!("failed to render notification: {}", e);
                    self.shutdown.trigger();
                    return;
                }
            }
        }

        if stream_closed && self.ready.is_resolved() && !self.shutdown.is_triggered() {
            info!("transport event stream closed");
            let _ = self.sink.notify("disconnected: connection closed");
            self.shutdown.trigger();
        }
        // An unresolved gate is released as abandoned when `ready` drops here
    }

    /// Apply one event; `Ok(false)` ends the pump
    fn handle(&mut self, event: TransportEvent) -> std::io::Result<bool> {
        debug!("transport event: {:?}", event);
        match event {
            TransportEvent::SessionReady => {
                info!("session established");
                self.ready.signal_ready();
                Ok(true)
            }
            TransportEvent::SessionFailed { reason } => {
                error!("session failed: {}", reason);
                if !self.ready.signal_failed(reason.clone()) {
                    // Already running: the session is gone, so the console must stop too
                    self.sink.notify(&Notice::Disconnected { reason }.to_string())?;
                    self.shutdown.trigger();
                }
                Ok(false)
            }
            TransportEvent::Disconnected { reason } => {
                info!("disconnected: {}", reason);
                if !self.ready.signal_failed(reason.clone()) {
                    self.sink.notify(&Notice::Disconnected { reason }.to_string())?;
                }
                self.shutdown.trigger();
                Ok(false)
            }
            other => {
                let notice = self.session.lock().apply(&other);
                if let Some(notice) = notice {
                    self.sink.notify(&notice.to_string())?;
                }
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::{CaptureBuffer, Screen};
    use std::time::Duration;
    use xc_core::{
        create_event_channel, Address, Contact, PresenceStatus, Session, StartupError, StartupGate,
    };

    const BOUND: Duration = Duration::from_secs(5);

    struct Fixture {
        pump: EventPump,
        session: SharedSession,
        capture: CaptureBuffer,
        shutdown: ShutdownFlag,
        wait: xc_core::ReadyWait,
        tx: xc_core::EventSender,
    }

    fn fixture() -> Fixture {
        let session = SharedSession::new(Session::new(Address::new("me@example.com")));
        let capture = CaptureBuffer::new();
        let screen = Screen::new(capture.clone());
        let (ready, wait) = StartupGate::new();
        let (tx, rx) = create_event_channel();
        let shutdown = ShutdownFlag::new();
        let sink = screen.notification_sink();
        let pump = EventPump::new(session.clone(), sink, ready, shutdown.clone(), rx);
        Fixture {
            pump,
            session,
            capture,
            shutdown,
            wait,
            tx,
        }
    }

    #[tokio::test]
    async fn test_events_applied_and_rendered_in_order() {
        let f = fixture();
        let handle = tokio::spawn(f.pump.run());

        f.tx.send(TransportEvent::RosterSnapshot {
            contacts: vec![Contact::new("bob@example.com", "Bob")],
        })
        .unwrap();
        f.tx.send(TransportEvent::SessionReady).unwrap();
        f.tx.send(TransportEvent::PresenceChanged {
            address: "bob@example.com".into(),
            resource: "pc".to_string(),
            status: PresenceStatus::Away,
        })
        .unwrap();
        f.tx.send(TransportEvent::MessageReceived {
            from: "bob@example.com".into(),
            body: "first".to_string(),
        })
        .unwrap();
        f.tx.send(TransportEvent::MessageReceived {
            from: "bob@example.com".into(),
            body: "second".to_string(),
        })
        .unwrap();

        f.wait.wait(BOUND).await.unwrap();
        drop(f.tx);
        tokio::time::timeout(BOUND, handle).await.unwrap().unwrap();

        let out = f.capture.contents();
        let presence = out.find("bob@example.com/pc is now away").unwrap();
        let first = out.find("Bob: first").unwrap();
        let second = out.find("Bob: second").unwrap();
        assert!(presence < first && first < second);
        let session = f.session.lock();
        let bob = session.roster().find_by_address(&"bob@example.com".into()).unwrap();
        assert!(bob.is_online());
        // Closing the stream after startup ends the console
        assert!(f.shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_session_failure_releases_gate() {
        let f = fixture();
        let handle = tokio::spawn(f.pump.run());
        f.tx.send(TransportEvent::SessionFailed {
            reason: "not-authorized".to_string(),
        })
        .unwrap();

        assert_eq!(
            f.wait.wait(BOUND).await,
            Err(StartupError::Failed("not-authorized".to_string()))
        );
        tokio::time::timeout(BOUND, handle).await.unwrap().unwrap();
        assert!(!f.shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_closed_stream_before_ready_abandons_startup() {
        let f = fixture();
        let handle = tokio::spawn(f.pump.run());
        drop(f.tx);
        assert_eq!(f.wait.wait(BOUND).await, Err(StartupError::Abandoned));
        tokio::time::timeout(BOUND, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_notifies_and_triggers_shutdown() {
        let f = fixture();
        let handle = tokio::spawn(f.pump.run());
        f.tx.send(TransportEvent::SessionReady).unwrap();
        f.tx.send(TransportEvent::Disconnected {
            reason: "stream reset".to_string(),
        })
        .unwrap();

        f.wait.wait(BOUND).await.unwrap();
        tokio::time::timeout(BOUND, handle).await.unwrap().unwrap();
        assert!(f.shutdown.is_triggered());
        assert!(f.capture.contents().contains("disconnected: stream reset"));
    }

    #[tokio::test]
    async fn test_session_failure_after_ready_stops_console() {
        let f = fixture();
        let handle = tokio::spawn(f.pump.run());
        f.tx.send(TransportEvent::SessionReady).unwrap();
        f.tx.send(TransportEvent::SessionFailed {
            reason: "conflict".to_string(),
        })
        .unwrap();

        f.wait.wait(BOUND).await.unwrap();
        tokio::time::timeout(BOUND, handle).await.unwrap().unwrap();
        assert!(f.shutdown.is_triggered());
        assert!(f.capture.contents().contains("disconnected: conflict"));
    }
}
