//! Crate includes reusable utils shared by applications built on the KAS wallet crates, such as
//! initializing the tracing framework.

pub mod logging;
