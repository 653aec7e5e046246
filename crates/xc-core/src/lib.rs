//! xc core
//!
//! Roster and presence model, recipient resolution, the startup gate and the
//! transport seam for the xc messaging console. Nothing in this crate touches
//! the terminal.

pub mod errors;
pub mod resolver;
pub mod roster;
pub mod session;
pub mod startup;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use errors::{ResolveError, StartupError, TransportError, TransportResult};
pub use resolver::{RecipientResolver, ResolvedTarget};
pub use roster::RosterStore;
pub use session::{Notice, Session, SharedSession};
pub use startup::{ReadySignal, ReadyWait, StartupGate};
pub use transport::{
    create_event_channel, EventReceiver, EventSender, LoopbackTransport, Transport,
    TransportEvent,
};
pub use types::{Address, Contact, PresenceStatus, Subscription};
