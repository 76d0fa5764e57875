//! CLI command implementations

pub(crate) mod check;
pub(crate) mod common;
pub(crate) mod current;
pub(crate) mod history;
pub(crate) mod init;
pub(crate) mod migrate;
pub(crate) mod stamp;
pub(crate) mod upgrade;
