pub mod plan;

pub use plan::TreatmentPlanService;
