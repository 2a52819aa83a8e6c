//! The HTTP runtime through which deployed endpoints are invoked.

mod api;
mod backend;

pub(crate) use backend::RuntimeBackend;
