
use thiserror::Error;

/// Result type of every fallible operation in the miner.
pub type Result<T> = std::result::Result<T, MiningError>;

/// Failures of a mining run. None of them is retried; each one means the caller handed in
/// something that violates an assumption of the algorithm.
#[derive( Debug, Error )]
pub enum MiningError {
    /// Rejected before any computation happens
    #[error( "invalid input: {0}" )]
    InvalidInput( String ),

    #[error( "the mean weight of an empty itemset is undefined" )]
    ArithmeticDegeneracy,

    /// The extended precision Poisson tail could not be represented as a machine float
    #[error( "precision loss while evaluating the Poisson bound: {0}" )]
    PrecisionLoss( String ),

    #[error( "bisection for the Poisson rate bound did not converge after {iterations} iterations (interval width {width:e})" )]
    NonConvergent { iterations: usize, width: f64 },

    #[error( "line {line}: {message}" )]
    Parse { line: usize, message: String },

    #[error( transparent )]
    Io( #[from] std::io::Error ),
}

impl MiningError {
    pub fn invalid <S: Into<String>> ( message: S ) -> MiningError {
	MiningError::InvalidInput( message.into() )
    }
}
