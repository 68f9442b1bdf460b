pub mod backdrop;
pub mod board;
pub mod domain;
pub mod flow;
pub mod gate;
pub mod ports;

pub use backdrop::Backdrop;
pub use board::{Board, Bubble, Detail, Disclosure, DisclosureMode, Placement};
pub use domain::{Comment, Fields, NewThought, Principal, StoredDocument, Thought, UserProfile};
pub use flow::{FlowError, Script, Step, StepCapability, SubmissionFlow, SubmitRejected};
pub use gate::{EmailPolicy, GateDecision, GateState, SessionGate};
pub use ports::{DocumentStore, IdentityService, MailService, PortError, PortResult};
