//! Test suites for the conduit daemon.

mod lib_api;
mod support;
