//! Robot identities and the garage that owns them

mod credential;
mod garage;

pub use credential::{IdentityError, RobotIdentity, RobotSummary};
pub use garage::{Garage, GarageError, GarageEvent, SubscriptionId};
