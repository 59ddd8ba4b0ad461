use thiserror::Error;

macro_rules! label_error {
    // Single format string version, inline captures only
    ($msg:expr) => {
        crate::Error::LabelResolution {
            message: format!($msg),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::LabelResolution {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into three groups with very different severities:
///
/// ## Load-time, per instrumentation point
/// - [`Error::AnchorNotFound`] - the target method's compiled shape no longer matches the
///   pattern an instrumentation point was authored against. Non-fatal: the point is skipped
///   and logged, the host method keeps running unmodified, and every other point still applies.
/// - [`Error::LabelResolution`] - a patch would have produced a stream with a dangling or
///   doubly-attached branch label. This is an authoring bug in the point itself and is fatal
///   to that point; a stream in this state is never installed.
/// - [`Error::AlreadyPatched`] - a plan was applied to a stream that has already been patched.
///   Plans are built against pristine streams and applied exactly once.
///
/// ## Stream editing
/// - [`Error::OutOfBounds`] - an index-based edit or anchor offset fell outside the stream.
///
/// ## Evaluation
/// - [`Error::UnsupportedInstruction`], [`Error::StackUnderflow`], [`Error::Eval`] - the
///   stream evaluator only handles the instruction shapes the host compiler actually
///   produces for instrumented methods, and fails loudly on anything else.
///
/// Note what is *not* here: a denied event is a normal control-flow outcome communicated
/// through the event's allow flag, never an error, and a stale wrapper lookup simply
/// returns `None`.
#[derive(Error, Debug)]
pub enum Error {
    /// No instruction in the target method matched an instrumentation point's anchor pattern.
    ///
    /// Reported at load time. The offending point is skipped; unrelated points are unaffected
    /// because every patch operation owns its stream exclusively.
    #[error("No anchor matching [{pattern}] in method '{method}'")]
    AnchorNotFound {
        /// Name of the target method that was scanned
        method: String,
        /// Human-readable rendering of the pattern that failed to match
        pattern: String,
    },

    /// A patched stream would contain a branch label that does not resolve to exactly one
    /// instruction.
    ///
    /// Dropping or duplicating a referenced label is an authoring error in the patch script,
    /// not a runtime condition to recover from; the stream is discarded rather than installed.
    #[error("Label resolution - {file}:{line}: {message}")]
    LabelResolution {
        /// The message to be printed for the label resolution error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A plan was applied to a stream that already carries a patch.
    #[error("Method '{0}' is already patched")]
    AlreadyPatched(String),

    /// An out of bound access was attempted while editing or evaluating a stream.
    #[error("Out of bound stream access would have occurred!")]
    OutOfBounds,

    /// The evaluator encountered an instruction shape outside the supported subset.
    #[error("Unsupported instruction during evaluation - {0}")]
    UnsupportedInstruction(String),

    /// The evaluation stack was popped while empty.
    ///
    /// Indicates a malformed insertion sequence; well-formed patch scripts keep the stack
    /// balanced across the splice point.
    #[error("Evaluation stack underflow")]
    StackUnderflow,

    /// General error during stream evaluation.
    #[error("{0}")]
    Eval(String),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
