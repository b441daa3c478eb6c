//! vt-devices: stock device wrappers for common test and run-control
//! equipment.
//!
//! Each wrapper assembles a [`vt_tree::Device`] whose variables are wired to
//! an external collaborator through value sources, a batch transport, and a
//! reset hook; nothing here talks to hardware directly.

pub mod data_writer;
pub mod prbs;
pub mod run_control;

pub use data_writer::{SimWriterCore, WriterCore, data_writer};
pub use prbs::{PrbsCore, SimPrbsCore, prbs_rx, prbs_tx};
pub use run_control::run_control;
