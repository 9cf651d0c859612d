mod agent;
pub mod algorithms;
pub mod networks;
pub mod policy;
mod random;
pub mod state_encoding;

pub use agent::{Agent, Transition};
pub use algorithms::{DqnAgent, DqnConfig};
pub use networks::{DqnNetwork, DqnNetworkConfig};
pub use policy::EpsilonGreedy;
pub use random::RandomAgent;
