mod bookkeeping;
mod environment;
mod population;

pub use bookkeeping::BookkeepingSystem;
pub use environment::EnvironmentSystem;
pub use population::PopulationSystem;
