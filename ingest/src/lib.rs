pub mod clock;
pub mod paths;
pub mod reassemble;
pub mod rotator;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use paths::sanitize_hwid;
pub use reassemble::{MessageKind, Reassembler};
pub use rotator::{SegmentRotator, WavParams};
pub use session::{IngestSession, InboundMessage, SessionDeps, SessionOutcome};
