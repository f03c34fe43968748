pub mod channel_link;
pub mod decision;
pub mod event;
pub mod usage_state;

pub use channel_link::{display_label, is_valid_channel_url};
pub use decision::{Decision, DecisionReason, StartAck};
pub use event::{event_channel, BatchEvent, BatchOutcome, EventReceiver, EventSender};
pub use usage_state::{StateUpdate, UsageState};
