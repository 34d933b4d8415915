//! Error taxonomy for schedule compilation and waveform generation.

/// Everything that can go wrong while building inputs or running
/// [`crate::generate_waveforms`].
///
/// All variants are fatal to the call that produced them: there is no
/// partial-result recovery path, matching the "errors surface as a single
/// typed failure" rule of the specification.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A structural problem with the caller's input: an unknown channel or
    /// shape name, a malformed filter/calibration matrix, a negative
    /// duration, a non-finite number where a finite one is required, or
    /// `min_duration > max_duration`.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A [`crate::shape::Shape::Interp`] was constructed with knots,
    /// coefficients, or degree that violate the B-spline invariants.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// During arrangement, a child's measured size exceeded its parent's
    /// final allocation and `allow_oversize` was `false`.
    #[error("element oversize: {0}")]
    Oversize(String),

    /// A [`crate::element::Grid`] has only `Star` columns and was measured
    /// with no finite outer duration to distribute.
    #[error("grid has only star columns and no finite outer duration")]
    UnresolvedGrid,

    /// An invariant was violated inside the engine itself. This indicates a
    /// bug rather than bad input; `debug_assert!` should have already
    /// caught it in a debug build.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;
