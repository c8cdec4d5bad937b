pub mod availability;

pub use availability::RoomAvailabilityService;
