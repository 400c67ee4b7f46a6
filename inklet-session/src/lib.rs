//! The incremental cross-cell compilation session.
//!
//! Each submitted cell is compiled as if it were the continuation of one
//! growing program; everything already executed is represented purely as a
//! signature-only declarations file that the next cell compiles against.

pub mod carry;
pub mod complete;
pub mod deps;
pub mod emit;
pub mod host;
pub mod mapper;
pub mod session;
pub mod vfs;

mod inspect;

pub use complete::{complete_at, CompletionList};
pub use deps::SideOutput;
pub use inspect::{quick_info_at, QuickInfo};
pub use mapper::{CellDiagnostic, Severity};
pub use session::{CompiledCellResult, Session, SessionError};
pub use vfs::{FileSystem, MemoryFs, RealFs};
