//! Router integration tests.

mod support;
mod batch;
mod store;
mod form;
mod poll;
mod api;
