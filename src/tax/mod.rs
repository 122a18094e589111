pub mod fifo;

pub use fifo::{calculate_fifo, DisposalRecord, DisposalWarning, FifoConfig, FifoReport};
