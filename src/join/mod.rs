// Join implementations
pub mod asof;
pub mod chain;
pub mod equi;
pub mod naming;

pub use asof::{asof_join, EqualityKey, JoinSpec};
pub use chain::{ChainSuffix, JoinChain};
pub use equi::{equi_join, JoinHow};
pub use naming::{escalating_suffix, Suffix};
