//! Routing solvers.
//!
//! [`solve_routing`] handles one closed collection route,
//! [`solve_path_routing`] one open trip segment, and
//! [`solve_fleet_routing`] a list of pre-assigned vehicle/pickup groups.
//! The order search behind them is a pluggable capability
//! ([`OrderSearch`]) configured through [`SolverConfig`].

mod capability;
mod fleet;
mod single;

pub use capability::{
    InputOrderFallback, LocalSearchOrder, OrderRequest, OrderSearch, Precedence, SearchTier,
    SolverConfig,
};
pub use fleet::{solve_fleet_routing, Assignment};
pub use single::{solve_path_routing, solve_routing};
