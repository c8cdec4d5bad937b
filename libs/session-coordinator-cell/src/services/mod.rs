pub mod coordinator;
pub mod desk;
pub mod driver;
pub mod sources;
pub mod submission;
pub mod tickets;

pub use coordinator::{AvailabilityCoordinator, CoordinatorOptions};
pub use desk::{spawn_draft_sweeper, DeskState, DraftEntry, DraftRegistry};
pub use driver::CoordinatorDriver;
pub use sources::{PlanSource, RoomSource, SessionSink, ShiftSource};
pub use submission::SessionSubmissionService;
pub use tickets::{Generation, RequestChannel, Ticket};
