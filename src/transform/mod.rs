//! Stage implementations of the reservation reconciler.
//!
//! [`cleaning`] holds the single-table stages (dedup, defaults, typing,
//! null filling, id assignment); [`reconcile`] holds the three passes that
//! pull values from the competitor snapshot.

pub mod cleaning;
pub mod reconcile;
