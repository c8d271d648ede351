//! vaultkeep daemon library: the processing worker, embedding sync worker,
//! WebDAV front end, and app wiring that back the `vaultkeep` binary.

pub mod app;
pub mod cli;
pub mod embedding_worker;
pub mod processor;
pub mod webdav;
pub mod worker;
