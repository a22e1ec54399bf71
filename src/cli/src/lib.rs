//! rootprep CLI - extract OCI image layers into a layer store.

pub mod commands;
pub mod output;
