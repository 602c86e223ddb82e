pub mod amount;
pub mod config;
pub mod csv;
pub mod engine;
pub mod model;

pub use amount::Cents;
pub use config::MachineConfig;
pub use engine::{Engine, Outcome, Receipt, VendError};
pub use model::{Coins, Command, Denomination, ItemKind, Items};
