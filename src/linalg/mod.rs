//! Dense BLAS-lite primitives and incremental factor updates over a
//! row-major buffer with a padded leading dimension.

pub mod dense;
pub mod update;
