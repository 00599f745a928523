//! Posting and delivery plumbing: per-identity dispatch records, the cross-thread ingress
//! queue, and the [`Poster`] handle.

mod ingress;
mod poster;
mod record;

pub use poster::Poster;

pub(crate) use ingress::Ingress;
pub(crate) use record::DispatchRecord;
