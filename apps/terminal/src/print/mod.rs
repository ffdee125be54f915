//! Receipt printing: the single-job guard, print surfaces and the receipt job
//! state machine.

pub mod guard;
pub mod receipt;
pub mod surface;

pub use guard::{GuardError, PrintJobGuard, PrintJobPermit};
pub use receipt::{
    CompletionCallback, PrintTiming, ReceiptError, ReceiptJobHandle, ReceiptOutcome,
    ReceiptRenderer, ReceiptState,
};
pub use surface::{PrintDispatch, PrintError, PrintSurface, SpoolSurface, SurfaceHandle};
