//! Scenario tests exercising the method handlers end to end against
//! `crate::memory`'s reference backend (§8's numbered scenarios).

mod scenarios;
