//! rollgate-probe — the actions run by the rollout control loop.
//!
//! Every action is a [`Probe`]: execute once and report whether it
//! succeeded. The [`ActionSet`] picks the probe for the subject's current
//! state.
//!
//! ```text
//! ActionSet
//!   ├── Pending        → deploy probe     → StartupDeploy
//!   ├── Deploying      → startup probe    → StartupProbe
//!   └── StartupSuccess → readiness probe  → ReadinessProbe
//! ```
//!
//! Terminal states have no action.

pub mod dispatcher;
pub mod net;
pub mod probe;

pub use dispatcher::{ActionKind, ActionOutcome, ActionSet};
pub use net::{HttpProbe, TcpProbe, http_probe, tcp_probe};
pub use probe::{Probe, ProbeFuture, ProbeResult, ScriptedProbe, StaticProbe};
