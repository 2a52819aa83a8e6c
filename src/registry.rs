//! The registry is the durable record of what runs behind each endpoint.
//!
//! Every deployed endpoint has exactly one record, keyed by its endpoint
//! name, which holds the deployment parameters (destination, instance type,
//! instance count, ...) and the models served by it (id, source, task,
//! default inference parameters). Records are stored as one TOML file per
//! endpoint inside the registry directory:
//!
//! ```text
//! <registry>/<endpoint name>.toml
//! ```
//!
//! Records are written once when a deployment is registered and read many
//! times by classification and dispatch. Writes replace the file atomically,
//! so concurrent readers observe either the old or the new record, never a
//! partially written one.
//!
//! A deployment may list several models, but classification and dispatch
//! only ever consult the first.

pub(crate) mod endpoint_name;
pub(crate) mod record;
pub(crate) mod store;
mod tempfile;

pub(crate) use record::{DeploymentRecord, ModelDeployment, ModelRecord, ModelSource};
pub(crate) use store::{Error, RecordStore};
