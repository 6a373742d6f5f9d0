pub mod attach;
pub mod chat;
pub mod entropy;
pub mod garage;
pub mod init;
pub mod order;
pub mod robot;
pub mod version;

pub use attach::Attach;
pub use chat::Chat;
pub use entropy::Entropy;
pub use garage::Garage;
pub use init::Init;
pub use order::Order;
pub use robot::Robot;
pub use version::Version;
