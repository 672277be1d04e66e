pub mod backup;
pub mod deployer;
pub mod watchdog;

pub use deployer::Deployer;
