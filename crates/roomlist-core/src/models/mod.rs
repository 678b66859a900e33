pub mod conversation;
pub mod criteria;
pub mod row;

pub use conversation::{Conversation, ConversationKind};
pub use criteria::{QueryCriteria, SortKey};
pub use row::{SectionLabel, ViewPhase, ViewRow, ViewState};
