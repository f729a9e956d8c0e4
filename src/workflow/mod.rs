pub mod progression;

pub use progression::{Oracles, ProgressionController};
