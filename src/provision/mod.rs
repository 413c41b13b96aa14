//! Account provisioning and jar installation paid by an origin account

mod accounts;
mod jars;

pub use accounts::{Account, AccountProvisioner, Accounts};
pub use jars::JarInstaller;
