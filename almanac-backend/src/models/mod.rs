pub mod completion;
pub mod entry;
pub mod reminder;
pub mod stub;

pub use completion::{Completable, Subtask};
pub use entry::{Entry, EntryBuilder, EntryDetail, EntryKind};
pub use reminder::{Reminder, Urgency};
pub use stub::EntryStub;
