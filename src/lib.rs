
#[cfg(test)]
macro_rules! assert_approx {
    ( $left:expr, $right:expr, $tolerance:expr ) => {{
	let (left, right, tolerance): (f64, f64, f64) = ( $left, $right, $tolerance );
	assert!( ( left - right ).abs() <= tolerance, "{left} and {right} differ by more than {tolerance}" );
    }};
}

pub mod data;
pub mod error;
pub mod io;
pub mod miner;
pub mod model;

pub use data::{Item, ItemId, Itemset, Transaction, Count, UncertainDatabase};
pub use error::{MiningError, Result};
pub use miner::{run, AprioriMiner, LevelDiagnostics, Miner, MiningResult, Termination};
pub use model::{Level, MiningConfig, RunContext, RunParameters, Strategy, WeightTable};

/// Objects that can be recorded in the log
pub trait Loggable {
    fn log(&self, message: &str, level: tracing::Level );
}

/// Emits an event at a level only known at runtime
pub(crate) fn log_at( level: tracing::Level, text: &str ) {
    if level == tracing::Level::ERROR {
	tracing::error!( "{text}" );
    } else if level == tracing::Level::WARN {
	tracing::warn!( "{text}" );
    } else if level == tracing::Level::INFO {
	tracing::info!( "{text}" );
    } else if level == tracing::Level::DEBUG {
	tracing::debug!( "{text}" );
    } else {
	tracing::trace!( "{text}" );
    }
}
