pub mod payment;
pub mod policy;
pub mod repository;
pub mod resolver;
pub mod service;
pub mod transitions;

pub use repository::{BookingRepository, GarageRepository, WorkerRepository};
pub use resolver::{ActorResolver, Relationship, Resolution};
pub use service::{BookingLifecycleService, Outcome};
